//! # Error Types
//!
//! Parsing and block-integrity errors shared by every carpost crate.
//! Both are local errors: they are always surfaced to the immediate caller
//! and never defaulted away.

use thiserror::Error;

use crate::identifier::Identifier;

/// Malformed textual input: identifiers, content URIs, addresses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Text is not a valid content identifier.
    #[error("invalid identifier {input:?}: {reason}")]
    InvalidIdentifier {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Text is not a valid content URI or gateway URL.
    #[error("invalid URI {input:?}: {reason}")]
    InvalidUri {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The URI scheme cannot be resolved through a gateway.
    #[error("unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    /// Text is not a valid 20-byte hex account address.
    #[error("invalid account address {input:?}: {reason}")]
    InvalidAddress {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Violations of the block hash invariant or the block-set closure property.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// The bytes do not hash to the identifier they were presented with.
    #[error("block bytes do not match identifier {cid}")]
    HashMismatch {
        /// The identifier the bytes were claimed to have.
        cid: Identifier,
    },

    /// The identifier uses a multihash function carpost cannot verify.
    #[error("unsupported multihash code 0x{code:x}")]
    UnsupportedHash {
        /// Multihash function code.
        code: u64,
    },

    /// The identifier uses a codec carpost cannot decode.
    #[error("unsupported codec 0x{code:x}")]
    UnsupportedCodec {
        /// Multicodec code.
        code: u64,
    },

    /// DAG-CBOR encoding or decoding failed.
    #[error("dag-cbor codec error: {0}")]
    Codec(String),

    /// A declared root is not present in the set.
    #[error("root {0} is not present in the block set")]
    MissingRoot(Identifier),

    /// A block links to an identifier that is not present in the set.
    #[error("block {from} links to {missing}, which is not present in the block set")]
    DanglingLink {
        /// The block holding the link.
        from: Identifier,
        /// The missing link target.
        missing: Identifier,
    },
}
