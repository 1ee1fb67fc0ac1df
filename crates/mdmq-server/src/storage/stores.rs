//! Store contract implementations for the `SQLite` database.

use async_trait::async_trait;

use super::db::{DatabaseError, MdmDatabase};
use super::models::{
    CommandMetadata, Device, NewDeviceApplication, NewDeviceCertificate, QueueHead,
};
use crate::protocol::NewCommand;
use crate::store::{ApplicationInventory, CertificateInventory, CommandStore, DeviceRegistry};

#[async_trait]
impl CommandStore for MdmDatabase {
    async fn create(&self, command: &NewCommand) -> Result<String, DatabaseError> {
        self.create_command(command).await
    }

    async fn create_if_drained(
        &self,
        command: &NewCommand,
    ) -> Result<Option<String>, DatabaseError> {
        self.create_command_if_drained(command).await
    }

    async fn next(&self, udid: &str) -> Result<QueueHead, DatabaseError> {
        self.next_command(udid).await
    }

    async fn remove(&self, udid: &str, command_uuid: &str) -> Result<i64, DatabaseError> {
        self.remove_command(udid, command_uuid).await
    }

    async fn find_metadata(&self, command_uuid: &str) -> Result<CommandMetadata, DatabaseError> {
        self.get_command(command_uuid).await.map(CommandMetadata::from)
    }
}

#[async_trait]
impl DeviceRegistry for MdmDatabase {
    async fn find_by_udid_or_serial(
        &self,
        udid: &str,
        serial_number: Option<&str>,
    ) -> Result<Vec<Device>, DatabaseError> {
        self.find_devices(udid, serial_number).await
    }

    async fn device_uuid(&self, udid: &str) -> Result<String, DatabaseError> {
        self.get_device_uuid(udid).await
    }

    async fn awaiting_configuration(&self, udid: &str) -> Result<bool, DatabaseError> {
        self.get_awaiting_configuration(udid).await
    }

    async fn save_attributes(&self, device: &Device) -> Result<(), DatabaseError> {
        self.update_device_attributes(device).await
    }
}

#[async_trait]
impl ApplicationInventory for MdmDatabase {
    async fn replace_applications(
        &self,
        device_uuid: &str,
        apps: &[NewDeviceApplication],
    ) -> Result<(), DatabaseError> {
        self.replace_device_applications(device_uuid, apps).await
    }
}

#[async_trait]
impl CertificateInventory for MdmDatabase {
    async fn replace_certificates(
        &self,
        device_uuid: &str,
        certs: &[NewDeviceCertificate],
    ) -> Result<(), DatabaseError> {
        self.replace_device_certificates(device_uuid, certs).await
    }
}
