//! # carpost-dag — Block Encoder
//!
//! Turns a job's [`Metadata`](carpost_core::Metadata) and its attached image
//! into a closed, deterministically hashed [`BlockSet`](carpost_core::BlockSet).
//!
//! ## Layout
//!
//! Raw leaves plus DAG-CBOR structural nodes:
//!
//! ```text
//! directory (dag-cbor)   { "<filename>": <link> }
//!   └─ file link
//!        ├─ raw leaf                                    (payload ≤ chunk size)
//!        └─ file node (dag-cbor) { "size": n, "parts": [<leaf>, ...] }
//!             └─ raw leaves, in payload order           (payload > chunk size)
//! ```
//!
//! Directory keys are written in DAG-CBOR canonical order (shorter keys
//! first, then bytewise), so identical content always serializes to
//! identical bytes and therefore the same root identifier.
//!
//! [`BlockEncoder::bundle`] additionally wraps the resolved metadata document
//! as `metadata.json` in a job directory next to the image, which is what the
//! remote store serves at `<root>/metadata.json`.

pub mod encoder;
pub mod error;
pub mod layout;
pub mod resolve;

pub use encoder::{BlockEncoder, Bundle, Encoded, EncoderConfig, DEFAULT_CHUNK_SIZE, METADATA_FILENAME};
pub use error::{EncodeError, ResolveError};
pub use layout::{Directory, FileNode};
pub use resolve::{read_file, resolve_path};
