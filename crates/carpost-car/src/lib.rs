//! # carpost-car — Archive Packer
//!
//! Serializes block sets as CAR v1 archives for transport, and reads them
//! back with full verification.
//!
//! ## Format
//!
//! ```text
//! varint(len) | dag-cbor {"roots": [<link>, ...], "version": 1}
//! varint(len) | cid bytes | block bytes        (repeated per block)
//! ```
//!
//! ## Back-Pressure
//!
//! Archives are produced lazily as a [`CarStream`]. Neither the pull-mode
//! [`pack`] nor the push-mode [`CarWriter`] holds more than one encoded
//! record ahead of the consumer, so an archive can be streamed into an HTTP
//! request body while blocks are still being produced.
//!
//! ## Partial Archives
//!
//! A stream that ends in [`StreamAbortedError`] has produced an incomplete
//! archive. [`CarReader`] rejects truncated input, so a partial archive that
//! reaches a reader anyway is never mistaken for a valid one.

pub mod error;
pub mod header;
pub mod reader;
pub mod writer;

pub use error::{CarError, StreamAbortedError};
pub use header::{CarHeader, CAR_VERSION};
pub use reader::CarReader;
pub use writer::{pack, pack_block_set, CarStream, CarWriter};

/// MIME type of a CAR archive request body.
pub const CAR_CONTENT_TYPE: &str = "application/vnd.ipld.car";
