//! CAR v1 header and record framing.

use bytes::{BufMut, Bytes, BytesMut};
use carpost_core::{Block, Identifier};
use cid::Cid;
use ipld_core::ipld::Ipld;
use serde::Serialize;

use crate::error::CarError;

/// The only archive version carpost reads or writes.
pub const CAR_VERSION: u64 = 1;

/// Archive header: format version plus the declared roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarHeader {
    roots: Vec<Identifier>,
}

#[derive(Serialize)]
struct HeaderWire<'a> {
    roots: &'a [Cid],
    version: u64,
}

impl CarHeader {
    /// Build a header. At least one root is required.
    pub fn new(roots: Vec<Identifier>) -> Result<Self, CarError> {
        if roots.is_empty() {
            return Err(CarError::NoRoots);
        }
        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[Identifier] {
        &self.roots
    }

    pub fn version(&self) -> u64 {
        CAR_VERSION
    }

    /// Length-prefixed DAG-CBOR encoding.
    pub fn encode(&self) -> Result<Bytes, CarError> {
        let roots: Vec<Cid> = self.roots.iter().map(|r| *r.as_cid()).collect();
        let body = serde_ipld_dagcbor::to_vec(&HeaderWire {
            roots: &roots,
            version: CAR_VERSION,
        })
        .map_err(|e| CarError::InvalidHeader(e.to_string()))?;
        Ok(frame(&[body.as_slice()]))
    }

    /// Decode the DAG-CBOR header body (without its length prefix).
    pub(crate) fn decode(body: &[u8]) -> Result<Self, CarError> {
        let value: Ipld = serde_ipld_dagcbor::from_slice(body)
            .map_err(|e| CarError::InvalidHeader(e.to_string()))?;
        let Ipld::Map(map) = value else {
            return Err(CarError::InvalidHeader("header is not a map".into()));
        };

        match map.get("version") {
            Some(Ipld::Integer(v)) if *v == i128::from(CAR_VERSION) => {}
            Some(Ipld::Integer(v)) => {
                return Err(CarError::UnsupportedVersion(u64::try_from(*v).unwrap_or(u64::MAX)))
            }
            _ => return Err(CarError::InvalidHeader("missing version".into())),
        }

        let roots = match map.get("roots") {
            Some(Ipld::List(items)) => items
                .iter()
                .map(|item| match item {
                    Ipld::Link(cid) => Ok(Identifier::from_cid(*cid)),
                    _ => Err(CarError::InvalidHeader("root is not a link".into())),
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
            _ => return Err(CarError::InvalidHeader("roots is not a list".into())),
        };
        Self::new(roots)
    }
}

/// Encode one block record: `varint(len) | cid | data`.
pub fn encode_record(block: &Block) -> Bytes {
    let cid = block.cid().to_bytes();
    frame(&[cid.as_slice(), block.data().as_ref()])
}

fn frame(parts: &[&[u8]]) -> Bytes {
    let len: usize = parts.iter().map(|p| p.len()).sum();
    let mut buf = unsigned_varint::encode::u64_buffer();
    let prefix = unsigned_varint::encode::u64(len as u64, &mut buf);
    let mut out = BytesMut::with_capacity(prefix.len() + len);
    out.put_slice(prefix);
    for part in parts {
        out.put_slice(part);
    }
    out.freeze()
}
