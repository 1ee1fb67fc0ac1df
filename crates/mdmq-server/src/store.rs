//! Store contracts the dispatcher is written against.
//!
//! Each store is owned independently; [`MdmDatabase`](crate::storage::MdmDatabase)
//! implements all four over one `SQLite` pool. Implementations must serialise
//! queue mutations per device and make inventory replaces atomic to readers.

use async_trait::async_trait;

use crate::protocol::NewCommand;
use crate::storage::{
    CommandMetadata, DatabaseError, Device, NewDeviceApplication, NewDeviceCertificate, QueueHead,
};

/// Per-device FIFO of pending commands plus metadata lookup.
#[async_trait]
pub trait CommandStore: Send + Sync {
    /// Append to the tail of the device's queue; returns the command identifier.
    async fn create(&self, command: &NewCommand) -> Result<String, DatabaseError>;

    /// Append only if the device's queue is empty, atomically with the
    /// check. `None` means another command got there first.
    async fn create_if_drained(
        &self,
        command: &NewCommand,
    ) -> Result<Option<String>, DatabaseError>;

    /// Peek at the head without removing it.
    async fn next(&self, udid: &str) -> Result<QueueHead, DatabaseError>;

    /// Remove by identifier at any position; returns the commands still
    /// queued. Unknown identifiers just report the current count.
    async fn remove(&self, udid: &str, command_uuid: &str) -> Result<i64, DatabaseError>;

    /// Resolve a command's classification, even after removal.
    /// Unknown identifiers yield [`DatabaseError::NotFound`].
    async fn find_metadata(&self, command_uuid: &str) -> Result<CommandMetadata, DatabaseError>;
}

/// Durable per-device records.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// All devices claiming this UDID or (when given) this serial number.
    async fn find_by_udid_or_serial(
        &self,
        udid: &str,
        serial_number: Option<&str>,
    ) -> Result<Vec<Device>, DatabaseError>;

    /// Surrogate key for a UDID.
    async fn device_uuid(&self, udid: &str) -> Result<String, DatabaseError>;

    async fn awaiting_configuration(&self, udid: &str) -> Result<bool, DatabaseError>;

    /// Overwrite attributes, snapshot and last check-in.
    async fn save_attributes(&self, device: &Device) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait ApplicationInventory: Send + Sync {
    async fn replace_applications(
        &self,
        device_uuid: &str,
        apps: &[NewDeviceApplication],
    ) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait CertificateInventory: Send + Sync {
    async fn replace_certificates(
        &self,
        device_uuid: &str,
        certs: &[NewDeviceCertificate],
    ) -> Result<(), DatabaseError>;
}
