use std::path::PathBuf;

use serde::Serialize;

/// The only error code reported to git-lfs: a generic transfer failure.
pub const ERROR_CODE_TRANSFER: i32 = 2;

/// Handshake acknowledgement, serialized as `{}`.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct Ack {}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TransferError {
    pub code: i32,
    pub message: String,
}

impl TransferError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: ERROR_CODE_TRANSFER,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Event {
    Progress {
        oid: String,
        #[serde(rename = "bytesSoFar")]
        bytes_so_far: u64,
        #[serde(rename = "bytesSinceLast")]
        bytes_since_last: u64,
    },
    Complete {
        oid: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<TransferError>,
    },
}

impl Event {
    /// Successful download; `path` holds the object's bytes.
    pub fn downloaded(oid: impl Into<String>, path: PathBuf) -> Self {
        Event::Complete {
            oid: oid.into(),
            path: Some(path),
            error: None,
        }
    }

    pub fn uploaded(oid: impl Into<String>) -> Self {
        Event::Complete {
            oid: oid.into(),
            path: None,
            error: None,
        }
    }

    pub fn failed(oid: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Complete {
            oid: oid.into(),
            path: None,
            error: Some(TransferError::new(message)),
        }
    }
}
