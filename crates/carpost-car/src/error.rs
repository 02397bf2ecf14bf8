//! Archive error types.

use carpost_core::BlockError;
use thiserror::Error;

/// The archive byte stream ended abnormally.
///
/// Raised when the upstream block producer fails, when a push-mode writer is
/// aborted or dropped before `close()`, or (on the producer side) when the
/// consumer has gone away. Bytes emitted before this error are never a valid
/// archive on their own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("archive stream aborted: {reason}")]
pub struct StreamAbortedError {
    reason: String,
}

impl StreamAbortedError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub(crate) fn consumer_closed() -> Self {
        Self::new("archive consumer closed the stream")
    }
}

/// Errors building or reading an archive.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CarError {
    /// The input ended inside a length prefix, header or record.
    #[error("archive truncated at byte {offset}")]
    Truncated {
        /// Offset of the incomplete element.
        offset: usize,
    },

    /// A length prefix is not a valid unsigned varint.
    #[error("invalid varint at byte {offset}")]
    InvalidVarint { offset: usize },

    /// The header is not a DAG-CBOR `{roots, version}` map.
    #[error("invalid archive header: {0}")]
    InvalidHeader(String),

    /// Only version 1 archives are supported.
    #[error("unsupported archive version {0}")]
    UnsupportedVersion(u64),

    /// The header declares no roots.
    #[error("archive header declares no roots")]
    NoRoots,

    /// A record is structurally invalid.
    #[error("invalid record at byte {offset}: {reason}")]
    InvalidRecord { offset: usize, reason: String },

    /// A record's bytes fail block validation.
    #[error("invalid block at byte {offset}: {source}")]
    Block {
        offset: usize,
        #[source]
        source: BlockError,
    },

    /// The archive stream was aborted before it completed.
    #[error(transparent)]
    Aborted(#[from] StreamAbortedError),
}
