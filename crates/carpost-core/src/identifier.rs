//! # Content Identifiers
//!
//! [`Identifier`] is the self-describing content address used everywhere in
//! carpost: `{hash function, codec, digest}` packed as a CID.
//!
//! ## Determinism Invariant
//!
//! [`Identifier::compute`] is the only way carpost derives identifiers from
//! bytes. It always hashes with SHA2-256 and emits CIDv1, so byte-identical
//! payloads under the same codec always yield the same identifier.
//!
//! ## Text Form
//!
//! CIDv1 renders as multibase base32-lower (`bafy...`, `bafk...`). CIDv0
//! (`Qm...`) is accepted on input because listings may carry it and renders
//! back in its own base58btc form, so canonical text round-trips exactly.

use std::fmt;
use std::str::FromStr;

use cid::multihash::Multihash;
use cid::Cid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{BlockError, ParseError};

/// Multicodec code for raw bytes.
pub const RAW_CODEC: u64 = 0x55;

/// Multicodec code for DAG-CBOR.
pub const DAG_CBOR_CODEC: u64 = 0x71;

/// Multicodec code for DAG-PB, only seen on CIDv0 identifiers.
pub const DAG_PB_CODEC: u64 = 0x70;

/// Multihash code for SHA2-256.
pub const SHA2_256: u64 = 0x12;

/// The block codecs carpost produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Opaque leaf bytes.
    Raw,
    /// Deterministic structured data with embedded links.
    DagCbor,
}

impl Codec {
    /// The multicodec code for this codec.
    pub fn code(self) -> u64 {
        match self {
            Self::Raw => RAW_CODEC,
            Self::DagCbor => DAG_CBOR_CODEC,
        }
    }

    /// Look up a codec by multicodec code.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            RAW_CODEC => Some(Self::Raw),
            DAG_CBOR_CODEC => Some(Self::DagCbor),
            _ => None,
        }
    }

    /// Human-readable codec name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::DagCbor => "dag-cbor",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content identifier.
///
/// Opaque to callers except through its canonical text form, its binary
/// form, and the codec/hash tags it declares.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Cid);

impl Identifier {
    /// Hash `data` with SHA2-256 and tag the result with `codec`.
    pub fn compute(codec: Codec, data: &[u8]) -> Self {
        Self(Cid::new_v1(codec.code(), sha256_multihash(data)))
    }

    /// Wrap an existing CID.
    pub fn from_cid(cid: Cid) -> Self {
        Self(cid)
    }

    /// Decode the binary CID form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        Cid::try_from(bytes)
            .map(Self)
            .map_err(|e| ParseError::InvalidIdentifier {
                input: hex::encode(bytes),
                reason: e.to_string(),
            })
    }

    /// Access the underlying CID.
    pub fn as_cid(&self) -> &Cid {
        &self.0
    }

    /// The binary CID form, as written into archive records.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// The multicodec code this identifier declares.
    pub fn codec_code(&self) -> u64 {
        self.0.codec()
    }

    /// The codec this identifier declares, if carpost knows it.
    pub fn codec(&self) -> Option<Codec> {
        Codec::from_code(self.0.codec())
    }

    /// The multihash function code this identifier declares.
    pub fn hash_code(&self) -> u64 {
        self.0.hash().code()
    }

    /// Check that `data` hashes to this identifier.
    ///
    /// Fails with [`BlockError::UnsupportedHash`] when the identifier was not
    /// produced with SHA2-256; carpost never guesses at other hash functions.
    pub fn verify(&self, data: &[u8]) -> Result<(), BlockError> {
        let hash = self.0.hash();
        if hash.code() != SHA2_256 {
            return Err(BlockError::UnsupportedHash { code: hash.code() });
        }
        if hash.digest() == Sha256::digest(data).as_slice() {
            Ok(())
        } else {
            Err(BlockError::HashMismatch { cid: *self })
        }
    }
}

fn sha256_multihash(data: &[u8]) -> Multihash<64> {
    let digest = Sha256::digest(data);
    Multihash::wrap(SHA2_256, &digest).expect("a 32-byte digest fits in a 64-byte multihash")
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.0)
    }
}

impl FromStr for Identifier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseError::InvalidIdentifier {
                input: s.to_string(),
                reason: "empty input".into(),
            });
        }
        Cid::try_from(trimmed)
            .map(Self)
            .map_err(|e| ParseError::InvalidIdentifier {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl From<Cid> for Identifier {
    fn from(cid: Cid) -> Self {
        Self(cid)
    }
}

impl From<Identifier> for Cid {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Canonical text always parses back to the same identifier.
        #[test]
        fn text_form_round_trips(data in prop::collection::vec(any::<u8>(), 0..512), cbor in any::<bool>()) {
            let codec = if cbor { Codec::DagCbor } else { Codec::Raw };
            let id = Identifier::compute(codec, &data);
            let text = id.to_string();
            let parsed: Identifier = text.parse().unwrap();
            prop_assert_eq!(parsed, id);
            prop_assert_eq!(parsed.to_string(), text);
        }

        /// The hash invariant holds for every computed identifier.
        #[test]
        fn computed_identifiers_verify(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let id = Identifier::compute(Codec::Raw, &data);
            prop_assert!(id.verify(&data).is_ok());
        }
    }
}
