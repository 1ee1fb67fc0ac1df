//! Acknowledgment dispatch errors.

use std::fmt;

use crate::protocol::ProtocolError;
use crate::storage::DatabaseError;

/// The step an acknowledgment or queue operation failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DeviceInformation,
    InstalledApplicationList,
    CertificateList,
    Queue,
    Requeue,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DeviceInformation => "device attribute reconciliation",
            Self::InstalledApplicationList => "application inventory replace",
            Self::CertificateList => "certificate inventory replace",
            Self::Queue => "queue operation",
            Self::Requeue => "configuration requeue",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("response carries no command UUID")]
    MissingCommandUuid,

    #[error("{stage}: response has no payload to reconcile")]
    MissingPayload { stage: Stage },

    #[error("no enrolled device matches udid {udid}, serial number {serial:?}")]
    Orphan {
        udid: String,
        serial: Option<String>,
    },

    #[error(
        "expected a single device for udid {udid}, serial number {serial:?}, but {matches} match"
    )]
    AmbiguousIdentity {
        udid: String,
        serial: Option<String>,
        matches: usize,
    },

    #[error("{stage}: no device record for udid {udid}")]
    UnknownDevice { stage: Stage, udid: String },

    #[error("{stage}: {source}")]
    Storage {
        stage: Stage,
        #[source]
        source: DatabaseError,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl DispatchError {
    /// Closure for `map_err` tagging a store failure with its stage.
    pub fn storage(stage: Stage) -> impl FnOnce(DatabaseError) -> Self {
        move |source| Self::Storage { stage, source }
    }

    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::MissingPayload { stage }
            | Self::UnknownDevice { stage, .. }
            | Self::Storage { stage, .. } => Some(*stage),
            Self::Orphan { .. } | Self::AmbiguousIdentity { .. } => Some(Stage::DeviceInformation),
            Self::MissingCommandUuid | Self::Protocol(_) => None,
        }
    }
}
