//! Encoder and resolver error types.

use std::path::PathBuf;

use carpost_core::{BlockError, Identifier};
use thiserror::Error;

/// Errors from [`BlockEncoder`](crate::BlockEncoder).
///
/// None of these are transient; the encoder never retries.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The image is not a local payload.
    #[error("expected a local image payload, got a {kind} image reference")]
    InvalidImageSource {
        /// Variant name of the rejected source.
        kind: &'static str,
    },

    /// Reading the local payload failed.
    #[error("failed to read image payload {}: {source}", path.display())]
    PayloadReadError {
        /// The path being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The published filename cannot be used as a directory entry.
    #[error("invalid filename {0:?}: must be non-empty, contain no '/', and not be reserved")]
    InvalidFilename(String),

    /// Encoder configuration is unusable.
    #[error("invalid encoder configuration: {0}")]
    InvalidConfig(String),

    /// Structured-data codec failure.
    #[error("codec error: {0}")]
    Codec(#[from] BlockError),

    /// The resolved metadata document could not be serialized.
    #[error("metadata serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors walking a path through an encoded block set.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// A block needed for the walk is absent.
    #[error("block {0} is not present")]
    MissingBlock(Identifier),

    /// A path segment does not exist in its directory.
    #[error("no entry {segment:?} in directory {directory}")]
    NotFound {
        /// Directory searched.
        directory: Identifier,
        /// Missing segment.
        segment: String,
    },

    /// A structural block does not have the expected shape.
    #[error("block {cid} is not a valid {expected}")]
    Malformed {
        /// Offending block.
        cid: Identifier,
        /// What it should have been.
        expected: &'static str,
    },

    /// Decoding a block failed.
    #[error("codec error: {0}")]
    Block(#[from] BlockError),
}
