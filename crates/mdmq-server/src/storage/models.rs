//! Data models for mdmq storage.

use serde::{Deserialize, Serialize};

use crate::protocol::{CertificateListItem, InstalledApplication, RequestType};

/// An enrolled device.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    /// Surrogate key referenced by inventory rows.
    pub uuid: String,
    pub udid: String,
    pub serial_number: Option<String>,
    pub product_name: Option<String>,
    pub build_version: Option<String>,
    pub device_name: Option<String>,
    pub imei: Option<String>,
    pub meid: Option<String>,
    pub model: Option<String>,
    pub os_version: Option<String>,
    /// Raw JSON of the last `DeviceInformation` answers.
    pub last_query_response: Option<Vec<u8>>,
    pub last_checkin: Option<i64>,
    pub awaiting_configuration: bool,
    pub enrolled_at: i64,
}

/// A stored command, pending or resolved.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommandRecord {
    pub command_uuid: String,
    pub udid: String,
    pub request_type: String,
    pub body: Vec<u8>,
    pub created_at: i64,
    pub resolved_at: Option<i64>,
}

impl CommandRecord {
    pub fn request_type(&self) -> RequestType {
        RequestType::from(self.request_type.as_str())
    }
}

/// What a command was, resolvable after it left the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMetadata {
    pub udid: String,
    pub request_type: RequestType,
    pub body: Vec<u8>,
}

impl From<CommandRecord> for CommandMetadata {
    fn from(record: CommandRecord) -> Self {
        Self {
            request_type: record.request_type(),
            udid: record.udid,
            body: record.body,
        }
    }
}

/// Head of a device's queue as seen by a poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueHead {
    /// Empty when the queue is empty.
    pub body: Vec<u8>,
    /// Commands queued for the device, head included.
    pub remaining: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceApplication {
    pub id: i64,
    pub device_uuid: String,
    pub name: String,
    pub identifier: Option<String>,
    pub short_version: Option<String>,
    pub version: Option<String>,
    pub bundle_size: Option<i64>,
    pub dynamic_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceCertificate {
    pub id: i64,
    pub device_uuid: String,
    pub common_name: String,
    pub is_identity: bool,
    pub data: Vec<u8>,
}

/// Row to insert on an application inventory replace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDeviceApplication {
    pub name: String,
    pub identifier: Option<String>,
    pub short_version: Option<String>,
    pub version: Option<String>,
    pub bundle_size: Option<i64>,
    pub dynamic_size: Option<i64>,
}

impl From<&InstalledApplication> for NewDeviceApplication {
    fn from(app: &InstalledApplication) -> Self {
        Self {
            name: app.name.clone(),
            identifier: app.identifier.clone(),
            short_version: app.short_version.clone(),
            version: app.version.clone(),
            bundle_size: app.bundle_size,
            dynamic_size: app.dynamic_size,
        }
    }
}

/// Row to insert on a certificate inventory replace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDeviceCertificate {
    pub common_name: String,
    pub is_identity: bool,
    pub data: Vec<u8>,
}

impl From<&CertificateListItem> for NewDeviceCertificate {
    fn from(cert: &CertificateListItem) -> Self {
        Self {
            common_name: cert.common_name.clone(),
            is_identity: cert.is_identity,
            data: cert.data.clone(),
        }
    }
}
