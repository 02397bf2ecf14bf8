//! # Structural Layout
//!
//! The two DAG-CBOR node kinds carpost writes and the leaf-splitting rule.
//!
//! ## Directory
//!
//! A DAG-CBOR map from entry name to link. Entries are kept sorted in
//! DAG-CBOR canonical key order (length first, then bytewise) and serialized
//! in that order, so the encoding does not depend on insertion order.
//!
//! ## File Node
//!
//! Written only when a payload is larger than one chunk:
//! `{"size": <total payload bytes>, "parts": [<raw leaf links in order>]}`.
//! Field order is canonical (`size` is shorter than `parts`).

use std::cmp::Ordering;

use bytes::Bytes;
use carpost_core::{Block, BlockError, Identifier};
use cid::Cid;
use ipld_core::ipld::Ipld;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::ResolveError;

/// DAG-CBOR canonical map key order.
fn canonical_key_order(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

/// A directory node: entry name to link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<(String, Identifier)>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. Returns the link previously stored under
    /// `name`, if any.
    pub fn insert(&mut self, name: impl Into<String>, cid: Identifier) -> Option<Identifier> {
        let name = name.into();
        match self
            .entries
            .binary_search_by(|(existing, _)| canonical_key_order(existing, &name))
        {
            Ok(i) => Some(std::mem::replace(&mut self.entries[i].1, cid)),
            Err(i) => {
                self.entries.insert(i, (name, cid));
                None
            }
        }
    }

    /// Look up an entry.
    pub fn get(&self, name: &str) -> Option<&Identifier> {
        self.entries
            .binary_search_by(|(existing, _)| canonical_key_order(existing, name))
            .ok()
            .map(|i| &self.entries[i].1)
    }

    /// Entries in canonical order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Identifier)> {
        self.entries.iter().map(|(name, cid)| (name.as_str(), cid))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode as a DAG-CBOR block.
    pub fn to_block(&self) -> Result<Block, BlockError> {
        Block::encode(self)
    }

    /// Decode a directory block.
    pub fn from_block(block: &Block) -> Result<Self, ResolveError> {
        let malformed = || ResolveError::Malformed {
            cid: *block.cid(),
            expected: "directory",
        };
        let Some(Ipld::Map(map)) = block.decode()? else {
            return Err(malformed());
        };
        let mut dir = Self::new();
        for (name, value) in map {
            match value {
                Ipld::Link(cid) => {
                    dir.insert(name, Identifier::from_cid(cid));
                }
                _ => return Err(malformed()),
            }
        }
        Ok(dir)
    }
}

impl Serialize for Directory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, cid) in &self.entries {
            map.serialize_entry(name, cid.as_cid())?;
        }
        map.end()
    }
}

/// A file node referencing its raw leaves in payload order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub size: u64,
    pub parts: Vec<Identifier>,
}

#[derive(Serialize)]
struct FileNodeWire {
    size: u64,
    parts: Vec<Cid>,
}

impl FileNode {
    /// Encode as a DAG-CBOR block.
    pub fn to_block(&self) -> Result<Block, BlockError> {
        Block::encode(&FileNodeWire {
            size: self.size,
            parts: self.parts.iter().map(|p| *p.as_cid()).collect(),
        })
    }

    /// Decode a file node block.
    pub fn from_block(block: &Block) -> Result<Self, ResolveError> {
        let malformed = || ResolveError::Malformed {
            cid: *block.cid(),
            expected: "file node",
        };
        let Some(Ipld::Map(map)) = block.decode()? else {
            return Err(malformed());
        };
        let size = match map.get("size") {
            Some(Ipld::Integer(n)) => u64::try_from(*n).map_err(|_| malformed())?,
            _ => return Err(malformed()),
        };
        let parts = match map.get("parts") {
            Some(Ipld::List(items)) => items
                .iter()
                .map(|item| match item {
                    Ipld::Link(cid) => Ok(Identifier::from_cid(*cid)),
                    _ => Err(malformed()),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(malformed()),
        };
        Ok(Self { size, parts })
    }
}

/// Blocks for one file: the link to publish and every block behind it,
/// structural node first.
#[derive(Debug, Clone)]
pub struct FileLayout {
    pub link: Identifier,
    pub size: u64,
    pub blocks: Vec<Block>,
}

/// Split an in-memory payload into chunks without copying.
pub fn split(data: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    (0..data.len())
        .step_by(chunk_size)
        .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
        .collect()
}

/// Lay out a payload given as consecutive chunks.
///
/// Zero or one chunk yields a single raw leaf; more chunks yield raw leaves
/// plus a file node.
pub fn layout_file(chunks: Vec<Bytes>) -> Result<FileLayout, BlockError> {
    let size: u64 = chunks.iter().map(|c| c.len() as u64).sum();
    if chunks.len() <= 1 {
        let leaf = Block::raw(chunks.into_iter().next().unwrap_or_default());
        return Ok(FileLayout {
            link: *leaf.cid(),
            size,
            blocks: vec![leaf],
        });
    }

    let leaves: Vec<Block> = chunks.into_iter().map(Block::raw).collect();
    let node = FileNode {
        size,
        parts: leaves.iter().map(|leaf| *leaf.cid()).collect(),
    }
    .to_block()?;

    let mut blocks = Vec::with_capacity(leaves.len() + 1);
    let link = *node.cid();
    blocks.push(node);
    blocks.extend(leaves);
    Ok(FileLayout { link, size, blocks })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(data: &'static [u8]) -> Identifier {
        *Block::raw(data).cid()
    }

    #[test]
    fn directory_order_is_insertion_independent() {
        let mut a = Directory::new();
        a.insert("metadata.json", leaf(b"m"));
        a.insert("cat.png", leaf(b"c"));
        a.insert("z", leaf(b"z"));

        let mut b = Directory::new();
        b.insert("z", leaf(b"z"));
        b.insert("cat.png", leaf(b"c"));
        b.insert("metadata.json", leaf(b"m"));

        assert_eq!(a, b);
        assert_eq!(a.to_block().unwrap(), b.to_block().unwrap());
        let names: Vec<&str> = a.entries().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["z", "cat.png", "metadata.json"]);
    }

    #[test]
    fn directory_insert_replaces() {
        let mut dir = Directory::new();
        assert_eq!(dir.insert("a", leaf(b"1")), None);
        assert_eq!(dir.insert("a", leaf(b"2")), Some(leaf(b"1")));
        assert_eq!(dir.get("a"), Some(&leaf(b"2")));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn directory_block_round_trip() {
        let mut dir = Directory::new();
        dir.insert("cat.png", leaf(b"c"));
        dir.insert("metadata.json", leaf(b"m"));
        let block = dir.to_block().unwrap();
        assert_eq!(Directory::from_block(&block).unwrap(), dir);
        assert_eq!(block.links().unwrap().len(), 2);
    }

    #[test]
    fn directory_rejects_raw_block() {
        let raw = Block::raw(&b"not a directory"[..]);
        assert!(matches!(
            Directory::from_block(&raw),
            Err(ResolveError::Malformed { expected: "directory", .. })
        ));
    }

    #[test]
    fn split_covers_payload_exactly() {
        let data = Bytes::from(vec![7u8; 10]);
        let chunks = split(&data, 4);
        let lens: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![4, 4, 2]);
        assert!(split(&Bytes::new(), 4).is_empty());
    }

    #[test]
    fn small_payload_is_single_leaf() {
        let layout = layout_file(vec![Bytes::from_static(b"tiny")]).unwrap();
        assert_eq!(layout.blocks.len(), 1);
        assert_eq!(layout.link, leaf(b"tiny"));
        assert_eq!(layout.size, 4);
    }

    #[test]
    fn empty_payload_is_empty_leaf() {
        let layout = layout_file(Vec::new()).unwrap();
        assert_eq!(layout.link, leaf(b""));
        assert_eq!(layout.size, 0);
    }

    #[test]
    fn chunked_payload_gets_file_node() {
        let data = Bytes::from((0u8..=99).collect::<Vec<u8>>());
        let layout = layout_file(split(&data, 30)).unwrap();
        assert_eq!(layout.blocks.len(), 5);
        let node = FileNode::from_block(&layout.blocks[0]).unwrap();
        assert_eq!(node.size, 100);
        assert_eq!(node.parts.len(), 4);
        assert_eq!(node.parts[0], *layout.blocks[1].cid());
        assert_eq!(*layout.blocks[0].cid(), layout.link);
    }
}
