//! Protocol-level values exchanged with managed devices.
//!
//! Wire encoding (property lists over HTTPS) belongs to the transport; these
//! types carry the protocol's key names through serde so a transport can
//! decode straight into them.

mod payload;
mod request_type;
mod response;

pub use payload::{CommandBody, CommandPayload, NewCommand};
pub use request_type::RequestType;
pub use response::{
    CertificateListItem, ErrorChainItem, InstalledApplication, QueryResponses, Response, Status,
};

/// Payload encode/decode errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
