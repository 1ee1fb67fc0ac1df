//! Device reports: the body of every check-in after enrollment.

use serde::{Deserialize, Serialize};

use super::RequestType;

/// Status a device attaches to each report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Nothing to report; the device is asking for work.
    Idle,
    /// The command named by `CommandUUID` completed.
    Acknowledged,
    /// The command failed on the device.
    Error,
    /// The device could not parse the command.
    CommandFormatError,
    /// The device cannot run the command now and will check in later.
    NotNow,
}

/// A decoded device report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    #[serde(rename = "UDID")]
    pub udid: String,
    #[serde(rename = "CommandUUID", default)]
    pub command_uuid: Option<String>,
    pub status: Status,
    /// Informational only: some devices omit it, so dispatch always uses the
    /// stored command metadata instead.
    #[serde(default)]
    pub request_type: Option<RequestType>,
    #[serde(default)]
    pub query_responses: Option<QueryResponses>,
    #[serde(default)]
    pub installed_application_list: Option<Vec<InstalledApplication>>,
    #[serde(default)]
    pub certificate_list: Option<Vec<CertificateListItem>>,
    #[serde(default)]
    pub error_chain: Option<Vec<ErrorChainItem>>,
}

impl Response {
    /// A bare report with the given status and no payload sections.
    pub fn new(udid: impl Into<String>, status: Status) -> Self {
        Self {
            udid: udid.into(),
            command_uuid: None,
            status,
            request_type: None,
            query_responses: None,
            installed_application_list: None,
            certificate_list: None,
            error_chain: None,
        }
    }

    #[must_use]
    pub fn for_command(mut self, command_uuid: impl Into<String>) -> Self {
        self.command_uuid = Some(command_uuid.into());
        self
    }
}

/// Answers to a `DeviceInformation` query.
///
/// Keys without a dedicated field are kept in `extra` so the stored snapshot
/// holds the full report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryResponses {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(rename = "IMEI", default, skip_serializing_if = "Option::is_none")]
    pub imei: Option<String>,
    #[serde(rename = "MEID", default, skip_serializing_if = "Option::is_none")]
    pub meid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "OSVersion", default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One entry of an `InstalledApplicationList` report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstalledApplication {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub short_version: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub bundle_size: Option<i64>,
    #[serde(default)]
    pub dynamic_size: Option<i64>,
}

/// One entry of a `CertificateList` report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertificateListItem {
    #[serde(default)]
    pub common_name: String,
    #[serde(default)]
    pub is_identity: bool,
    #[serde(default)]
    pub data: Vec<u8>,
}

/// One link of the error chain a device sends with `Error` status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorChainItem {
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_domain: String,
    #[serde(default)]
    pub localized_description: String,
}
