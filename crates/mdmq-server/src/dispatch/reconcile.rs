//! Inventory reconciliation routines, one per reconciled request type.

use mdmq_core::db::unix_timestamp;
use tracing::debug;

use super::error::{DispatchError, Stage};
use super::AckDispatcher;
use crate::protocol::{ProtocolError, QueryResponses, Response};
use crate::storage::{Device, NewDeviceApplication, NewDeviceCertificate};

impl AckDispatcher {
    /// `DeviceInformation`: overwrite the one device this report belongs to.
    ///
    /// Every attribute is replaced by the reported value, serial number
    /// included: a key the answer leaves out is stored as NULL, even if the
    /// query simply did not ask for it. Matching ignores an absent or empty
    /// serial and falls back to the UDID alone.
    pub(super) async fn reconcile_device_information(
        &self,
        response: &Response,
    ) -> Result<(), DispatchError> {
        let stage = Stage::DeviceInformation;
        let query = response
            .query_responses
            .as_ref()
            .ok_or(DispatchError::MissingPayload { stage })?;
        let serial = query.serial_number.as_deref().filter(|s| !s.is_empty());

        let mut matches = self
            .devices
            .find_by_udid_or_serial(&response.udid, serial)
            .await
            .map_err(DispatchError::storage(stage))?;

        let mut device = match matches.len() {
            0 => {
                return Err(DispatchError::Orphan {
                    udid: response.udid.clone(),
                    serial: serial.map(str::to_string),
                });
            }
            1 => matches.swap_remove(0),
            n => {
                return Err(DispatchError::AmbiguousIdentity {
                    udid: response.udid.clone(),
                    serial: serial.map(str::to_string),
                    matches: n,
                });
            }
        };

        apply_query_responses(&mut device, query)?;
        self.devices
            .save_attributes(&device)
            .await
            .map_err(DispatchError::storage(stage))?;

        debug!(udid = %device.udid, device_uuid = %device.uuid, "Device attributes updated");
        Ok(())
    }

    /// `InstalledApplicationList`: replace the device's application set.
    pub(super) async fn replace_applications(&self, response: &Response) -> Result<(), DispatchError> {
        let stage = Stage::InstalledApplicationList;
        let device_uuid = self.resolve_device_uuid(&response.udid, stage).await?;

        let apps: Vec<NewDeviceApplication> = response
            .installed_application_list
            .iter()
            .flatten()
            .map(NewDeviceApplication::from)
            .collect();

        self.apps
            .replace_applications(&device_uuid, &apps)
            .await
            .map_err(DispatchError::storage(stage))?;

        debug!(udid = %response.udid, count = apps.len(), "Application inventory replaced");
        Ok(())
    }

    /// `CertificateList`: replace the device's certificate set.
    pub(super) async fn replace_certificates(&self, response: &Response) -> Result<(), DispatchError> {
        let stage = Stage::CertificateList;
        let device_uuid = self.resolve_device_uuid(&response.udid, stage).await?;

        let certs: Vec<NewDeviceCertificate> = response
            .certificate_list
            .iter()
            .flatten()
            .map(NewDeviceCertificate::from)
            .collect();

        self.certs
            .replace_certificates(&device_uuid, &certs)
            .await
            .map_err(DispatchError::storage(stage))?;

        debug!(udid = %response.udid, count = certs.len(), "Certificate inventory replaced");
        Ok(())
    }

    async fn resolve_device_uuid(&self, udid: &str, stage: Stage) -> Result<String, DispatchError> {
        match self.devices.device_uuid(udid).await {
            Ok(uuid) => Ok(uuid),
            Err(e) if e.is_not_found() => Err(DispatchError::UnknownDevice {
                stage,
                udid: udid.to_string(),
            }),
            Err(e) => Err(DispatchError::storage(stage)(e)),
        }
    }
}

fn apply_query_responses(device: &mut Device, query: &QueryResponses) -> Result<(), ProtocolError> {
    device.last_query_response = Some(serde_json::to_vec(query)?);
    device.last_checkin = Some(unix_timestamp());

    device.product_name.clone_from(&query.product_name);
    device.build_version.clone_from(&query.build_version);
    device.device_name.clone_from(&query.device_name);
    device.imei.clone_from(&query.imei);
    device.meid.clone_from(&query.meid);
    device.model.clone_from(&query.model);
    device.os_version.clone_from(&query.os_version);
    device.serial_number.clone_from(&query.serial_number);
    Ok(())
}
