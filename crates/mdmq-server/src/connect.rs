//! Queue access façade for the transport layer.
//!
//! Every device report after enrollment lands here. The report's status
//! decides whether it acknowledges, fails or merely polls; the reply carries
//! the next command to deliver, if any.

use tracing::{info, instrument, warn};

use crate::dispatch::{AckDispatcher, DispatchError};
use crate::protocol::{NewCommand, Response, Status};
use crate::storage::QueueHead;

/// What goes back to the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Command body to deliver; `None` means an empty reply.
    pub body: Option<Vec<u8>>,
    pub remaining: i64,
}

impl Reply {
    pub const fn empty() -> Self {
        Self {
            body: None,
            remaining: 0,
        }
    }
}

impl From<QueueHead> for Reply {
    fn from(head: QueueHead) -> Self {
        Self {
            body: (!head.body.is_empty()).then_some(head.body),
            remaining: head.remaining,
        }
    }
}

#[derive(Clone)]
pub struct ConnectService {
    dispatcher: AckDispatcher,
}

impl ConnectService {
    pub const fn new(dispatcher: AckDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Management entry point: queue a command for delivery.
    pub async fn enqueue(&self, command: &NewCommand) -> Result<String, DispatchError> {
        self.dispatcher.enqueue(command).await
    }

    /// Handle one device report and produce the reply.
    ///
    /// - `Idle`: deliver the head of the queue.
    /// - `Acknowledged`: acknowledge, then deliver the next command.
    /// - `Error`, `CommandFormatError`: drop the command, then deliver the next.
    /// - `NotNow`: reply empty; the command stays queued for a later poll.
    #[instrument(skip(self, response), fields(udid = %response.udid, status = ?response.status))]
    pub async fn connect(&self, response: &Response) -> Result<Reply, DispatchError> {
        let udid = response.udid.as_str();

        match response.status {
            Status::Idle => self.next(udid).await,
            Status::Acknowledged => {
                let remaining = self.dispatcher.acknowledge(response).await?;
                if remaining == 0 {
                    return Ok(Reply::empty());
                }
                self.next(udid).await
            }
            Status::Error | Status::CommandFormatError => {
                let command_uuid = response
                    .command_uuid
                    .as_deref()
                    .ok_or(DispatchError::MissingCommandUuid)?;
                for link in response.error_chain.iter().flatten() {
                    warn!(
                        command_uuid,
                        code = link.error_code,
                        domain = %link.error_domain,
                        description = %link.localized_description,
                        "Device reported command error"
                    );
                }
                self.dispatcher.fail_command(udid, command_uuid).await?;
                self.next(udid).await
            }
            Status::NotNow => {
                info!(command_uuid = ?response.command_uuid, "Device deferred command");
                Ok(Reply::empty())
            }
        }
    }

    async fn next(&self, udid: &str) -> Result<Reply, DispatchError> {
        self.dispatcher.next_command(udid).await.map(Reply::from)
    }
}
