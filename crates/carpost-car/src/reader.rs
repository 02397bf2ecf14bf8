//! Verifying archive reader.
//!
//! Reads a complete CAR v1 archive. Every record is hash-checked; a
//! truncated length prefix, header or final record is rejected rather than
//! silently dropped.

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use carpost_core::{Block, BlockSet, Identifier};
use cid::Cid;
use futures::{Stream, StreamExt};

use crate::error::{CarError, StreamAbortedError};
use crate::header::CarHeader;

/// A parsed archive.
#[derive(Debug, Clone)]
pub struct CarReader {
    header: CarHeader,
    blocks: Vec<Block>,
}

impl CarReader {
    /// Parse and verify a complete archive.
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self, CarError> {
        let data: Bytes = data.into();
        let mut offset = 0;

        let header_len = read_length(&data, &mut offset)?;
        if header_len == 0 {
            return Err(CarError::InvalidHeader("empty header".into()));
        }
        let header_body = take(&data, &mut offset, header_len)?;
        let header = CarHeader::decode(&header_body)?;

        let mut blocks = Vec::new();
        while offset < data.len() {
            let record_at = offset;
            let len = read_length(&data, &mut offset)?;
            let section = take(&data, &mut offset, len)?;
            blocks.push(parse_record(section, record_at)?);
        }

        tracing::debug!(roots = header.roots().len(), blocks = blocks.len(), "read archive");
        Ok(Self { header, blocks })
    }

    /// Drain an archive stream and parse it.
    pub async fn from_stream<S>(mut stream: S) -> Result<Self, CarError>
    where
        S: Stream<Item = Result<Bytes, StreamAbortedError>> + Unpin,
    {
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Self::from_bytes(buf.freeze())
    }

    pub fn header(&self) -> &CarHeader {
        &self.header
    }

    pub fn roots(&self) -> &[Identifier] {
        self.header.roots()
    }

    /// Blocks in archive order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Collect into a block set with the archive's roots. Duplicate records
    /// collapse.
    pub fn into_block_set(self) -> BlockSet {
        let mut set = BlockSet::new(self.header.roots().to_vec());
        set.extend(self.blocks);
        set
    }
}

fn read_length(data: &[u8], offset: &mut usize) -> Result<usize, CarError> {
    let at = *offset;
    let (len, rest) = unsigned_varint::decode::u64(&data[at..]).map_err(|e| match e {
        unsigned_varint::decode::Error::Insufficient => CarError::Truncated { offset: at },
        _ => CarError::InvalidVarint { offset: at },
    })?;
    *offset = data.len() - rest.len();
    usize::try_from(len).map_err(|_| CarError::InvalidVarint { offset: at })
}

fn take(data: &Bytes, offset: &mut usize, len: usize) -> Result<Bytes, CarError> {
    let start = *offset;
    let end = start
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or(CarError::Truncated { offset: start })?;
    *offset = end;
    Ok(data.slice(start..end))
}

fn parse_record(section: Bytes, offset: usize) -> Result<Block, CarError> {
    if section.is_empty() {
        return Err(CarError::InvalidRecord {
            offset,
            reason: "empty record".into(),
        });
    }
    let mut cursor = Cursor::new(section.as_ref());
    let cid = Cid::read_bytes(&mut cursor).map_err(|e| CarError::InvalidRecord {
        offset,
        reason: e.to_string(),
    })?;
    // The cursor never advances past the section, so this cast is lossless.
    let cid_len = cursor.position() as usize;
    Block::new(Identifier::from_cid(cid), section.slice(cid_len..))
        .map_err(|source| CarError::Block { offset, source })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::writer::pack_block_set;
    use carpost_core::Codec;
    use proptest::prelude::*;

    proptest! {
        /// Packing then reading preserves roots and every block byte-for-byte,
        /// for any block count including zero.
        #[test]
        fn pack_then_read(payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 0..12)) {
            let blocks: Vec<Block> = payloads.into_iter().map(Block::raw).collect();
            let root = Identifier::compute(Codec::DagCbor, b"root");
            let mut set = BlockSet::new(vec![root]);
            set.extend(blocks);

            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let bytes = rt.block_on(pack_block_set(&set).into_bytes()).unwrap();
            let back = CarReader::from_bytes(bytes).unwrap().into_block_set();
            prop_assert_eq!(back, set);
        }
    }
}
