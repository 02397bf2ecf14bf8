//! # carpost-core — Foundational Types
//!
//! Every other carpost crate depends on this one; it depends on nothing
//! internal. It defines the content-addressing primitives that the encoder,
//! the archive packer and the remote-store client share.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** [`Identifier`] wraps a CIDv1/v0 and
//!    [`AccountAddress`] wraps a 20-byte account address. No bare strings
//!    cross crate boundaries.
//!
//! 2. **Blocks verify themselves.** A [`Block`] can only be built by hashing
//!    its bytes, or by presenting an identifier that the bytes hash to. The
//!    decoded value is always recomputed from the bytes.
//!
//! 3. **Closed block sets.** [`BlockSet::verify_closure`] rejects any set in
//!    which a root or an embedded link points outside the set.
//!
//! 4. **Image references are a sum type.** [`ImageSource`] distinguishes a
//!    remote URL, a local payload awaiting encoding, and an already-resolved
//!    content URI; consumers match on it exhaustively.
//!
//! 5. **Explicit job cache.** [`JobRepository`] is constructed by the caller
//!    and injected; there is no process-global memo.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `carpost-*` crates.
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod address;
pub mod block;
pub mod error;
pub mod identifier;
pub mod job;
pub mod metadata;
pub mod resolver;

pub use address::AccountAddress;
pub use block::{Block, BlockSet};
pub use error::{BlockError, ParseError};
pub use identifier::{Codec, Identifier};
pub use job::{Job, JobRepository};
pub use metadata::{ImageSource, LocalFile, Metadata, Payload, Properties};
pub use resolver::{gatewayize, to_gateway_url, to_uri, ContentUri, IPFS_SCHEME};
