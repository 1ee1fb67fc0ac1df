//! Acknowledgment dispatcher.
//!
//! Interprets a device's report against the command it answers, reconciles
//! inventory, drains the queue and enqueues the `DeviceConfigured` follow-up
//! for devices mid-setup. Holds no state beyond handles to the stores.

mod error;
mod reconcile;


use std::sync::Arc;

use tracing::{debug, info, warn};

pub use error::{DispatchError, Stage};

use crate::protocol::{NewCommand, RequestType, Response};
use crate::storage::{MdmDatabase, QueueHead};
use crate::store::{ApplicationInventory, CertificateInventory, CommandStore, DeviceRegistry};

#[derive(Clone)]
pub struct AckDispatcher {
    commands: Arc<dyn CommandStore>,
    devices: Arc<dyn DeviceRegistry>,
    apps: Arc<dyn ApplicationInventory>,
    certs: Arc<dyn CertificateInventory>,
}

impl AckDispatcher {
    pub fn new(
        commands: Arc<dyn CommandStore>,
        devices: Arc<dyn DeviceRegistry>,
        apps: Arc<dyn ApplicationInventory>,
        certs: Arc<dyn CertificateInventory>,
    ) -> Self {
        Self {
            commands,
            devices,
            apps,
            certs,
        }
    }

    /// All four stores backed by one database.
    pub fn from_database(db: &MdmDatabase) -> Self {
        let db = Arc::new(db.clone());
        Self::new(db.clone(), db.clone(), db.clone(), db)
    }

    /// Append a command to a device's queue.
    pub async fn enqueue(&self, command: &NewCommand) -> Result<String, DispatchError> {
        let id = self
            .commands
            .create(command)
            .await
            .map_err(DispatchError::storage(Stage::Queue))?;

        info!(
            udid = %command.udid,
            command_uuid = %id,
            request_type = %command.request_type,
            "Command enqueued"
        );
        #[cfg(feature = "metrics")]
        mdmq_core::metrics::queue_meters().enqueued(command.request_type.as_str());

        Ok(id)
    }

    /// Head of the device's queue. A read: the command stays queued until
    /// acknowledged or failed.
    pub async fn next_command(&self, udid: &str) -> Result<QueueHead, DispatchError> {
        self.commands
            .next(udid)
            .await
            .map_err(DispatchError::storage(Stage::Queue))
    }

    /// Accept a device's answer to a delivered command.
    ///
    /// Returns the commands still queued for the device. If reconciliation
    /// fails the command is left queued so redelivery can retry it.
    pub async fn acknowledge(&self, response: &Response) -> Result<i64, DispatchError> {
        let udid = response.udid.as_str();
        let command_uuid = response
            .command_uuid
            .as_deref()
            .ok_or(DispatchError::MissingCommandUuid)?;

        let request_type = self.classify(udid, command_uuid).await?;

        let outcome = match &request_type {
            Some(RequestType::DeviceInformation) => {
                self.reconcile_device_information(response).await
            }
            Some(RequestType::InstalledApplicationList) => self.replace_applications(response).await,
            Some(RequestType::CertificateList) => self.replace_certificates(response).await,
            _ => {
                debug!(udid, command_uuid, "No reconciliation for response");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!(
                udid,
                command_uuid,
                stage = ?e.stage(),
                error = %e,
                "Reconciliation failed, command stays queued"
            );
            return Err(e);
        }

        let remaining = self
            .commands
            .remove(udid, command_uuid)
            .await
            .map_err(DispatchError::storage(Stage::Queue))?;

        info!(udid, command_uuid, remaining, "Command acknowledged");
        #[cfg(feature = "metrics")]
        mdmq_core::metrics::queue_meters().acknowledged(
            request_type.as_ref().map_or("unattributed", RequestType::as_str),
        );

        if remaining == 0 {
            return self.check_requeue(udid).await;
        }
        Ok(remaining)
    }

    /// Drop a command the device rejected.
    ///
    /// Unlike [`acknowledge`](Self::acknowledge) this never enqueues the
    /// `DeviceConfigured` follow-up, even when it empties the queue of a
    /// device awaiting configuration.
    pub async fn fail_command(&self, udid: &str, command_uuid: &str) -> Result<i64, DispatchError> {
        let remaining = self
            .commands
            .remove(udid, command_uuid)
            .await
            .map_err(DispatchError::storage(Stage::Queue))?;

        info!(udid, command_uuid, remaining, "Command failed on device, removed");
        #[cfg(feature = "metrics")]
        mdmq_core::metrics::queue_meters().failed();

        Ok(remaining)
    }

    /// Request type of the command being answered, or `None` when the
    /// command is unknown or belongs to another device.
    async fn classify(
        &self,
        udid: &str,
        command_uuid: &str,
    ) -> Result<Option<RequestType>, DispatchError> {
        match self.commands.find_metadata(command_uuid).await {
            Ok(meta) if meta.udid == udid => Ok(Some(meta.request_type)),
            Ok(meta) => {
                warn!(
                    udid,
                    command_uuid,
                    owner = %meta.udid,
                    "Response names a command queued for another device"
                );
                Ok(None)
            }
            Err(e) if e.is_not_found() => {
                warn!(udid, command_uuid, "Response for unknown command");
                Ok(None)
            }
            Err(e) => Err(DispatchError::storage(Stage::Queue)(e)),
        }
    }

    /// Enqueue `DeviceConfigured` if the now-empty device is awaiting
    /// configuration. Returns the new queue length.
    ///
    /// The enqueue re-checks emptiness in the store, so racing acknowledgments
    /// of the same final command produce a single follow-up.
    async fn check_requeue(&self, udid: &str) -> Result<i64, DispatchError> {
        let awaiting = match self.devices.awaiting_configuration(udid).await {
            Ok(awaiting) => awaiting,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(DispatchError::storage(Stage::Requeue)(e)),
        };
        if !awaiting {
            return Ok(0);
        }

        let command = NewCommand::new(udid, RequestType::DeviceConfigured)?;
        let Some(id) = self
            .commands
            .create_if_drained(&command)
            .await
            .map_err(DispatchError::storage(Stage::Requeue))?
        else {
            // A concurrent acknowledgment or enqueue refilled the queue first.
            let head = self
                .commands
                .next(udid)
                .await
                .map_err(DispatchError::storage(Stage::Requeue))?;
            debug!(udid, remaining = head.remaining, "Queue refilled before requeue, skipped");
            return Ok(head.remaining);
        };

        info!(udid, command_uuid = %id, "Queue drained while awaiting configuration, DeviceConfigured enqueued");
        #[cfg(feature = "metrics")]
        mdmq_core::metrics::queue_meters().requeued();

        Ok(1)
    }
}
