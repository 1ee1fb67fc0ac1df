//! Command payload envelope.

use serde::{Deserialize, Serialize};

use super::{ProtocolError, RequestType};

/// The envelope a device receives: `{CommandUUID, Command: {RequestType, ..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandPayload {
    #[serde(rename = "CommandUUID")]
    pub command_uuid: String,
    pub command: CommandBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandBody {
    pub request_type: RequestType,
    /// Request-specific keys (e.g. `Queries`, `Identifier`).
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl CommandPayload {
    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// A command ready to be appended to a device's queue.
///
/// The identifier is assigned here, before storage, because it is embedded
/// in the body the device echoes back when acknowledging.
#[derive(Debug, Clone)]
pub struct NewCommand {
    pub udid: String,
    pub command_uuid: String,
    pub request_type: RequestType,
    pub body: Vec<u8>,
}

impl NewCommand {
    pub fn new(udid: impl Into<String>, request_type: RequestType) -> Result<Self, ProtocolError> {
        Self::with_params(udid, request_type, serde_json::Map::new())
    }

    pub fn with_params(
        udid: impl Into<String>,
        request_type: RequestType,
        params: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ProtocolError> {
        let payload = CommandPayload {
            command_uuid: uuid::Uuid::new_v4().to_string(),
            command: CommandBody {
                request_type,
                params,
            },
        };
        let body = payload.encode()?;

        Ok(Self {
            udid: udid.into(),
            command_uuid: payload.command_uuid,
            request_type: payload.command.request_type,
            body,
        })
    }
}
