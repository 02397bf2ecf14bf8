//! # Blocks and Block Sets
//!
//! A [`Block`] is an immutable `(identifier, bytes)` pair satisfying the
//! hash invariant: the identifier is the SHA2-256 CID of the bytes under the
//! codec it declares. The decoded value is never stored; [`Block::decode`]
//! projects it from the bytes on demand so it cannot drift.
//!
//! A [`BlockSet`] is an insertion-ordered, de-duplicated collection of blocks
//! plus the root identifiers consumers resolve first.
//!
//! ## Closure Invariant
//!
//! Every identifier reachable from a root by following embedded links must be
//! present. [`BlockSet::verify_closure`] checks this; the encoder calls it on
//! everything it produces.

use std::collections::{HashMap, HashSet};

use bytes::Bytes;
use ipld_core::ipld::Ipld;
use serde::Serialize;

use crate::error::BlockError;
use crate::identifier::{Codec, Identifier};

/// A verified content-addressed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    cid: Identifier,
    data: Bytes,
}

impl Block {
    /// Build a block from an identifier and the bytes claimed to hash to it.
    pub fn new(cid: Identifier, data: impl Into<Bytes>) -> Result<Self, BlockError> {
        let data = data.into();
        cid.verify(&data)?;
        Ok(Self { cid, data })
    }

    /// Build a raw leaf block by hashing `data`.
    pub fn raw(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let cid = Identifier::compute(Codec::Raw, &data);
        Self { cid, data }
    }

    /// Encode `value` as DAG-CBOR and hash the result.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self, BlockError> {
        let data = serde_ipld_dagcbor::to_vec(value).map_err(|e| BlockError::Codec(e.to_string()))?;
        let cid = Identifier::compute(Codec::DagCbor, &data);
        Ok(Self {
            cid,
            data: Bytes::from(data),
        })
    }

    /// The block's identifier.
    pub fn cid(&self) -> &Identifier {
        &self.cid
    }

    /// The block's raw bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Decode the structured value of a DAG-CBOR block.
    ///
    /// Raw blocks have no structured value and yield `None`.
    pub fn decode(&self) -> Result<Option<Ipld>, BlockError> {
        match Codec::from_code(self.cid.codec_code()) {
            Some(Codec::Raw) => Ok(None),
            Some(Codec::DagCbor) => serde_ipld_dagcbor::from_slice(&self.data)
                .map(Some)
                .map_err(|e| BlockError::Codec(e.to_string())),
            None => Err(BlockError::UnsupportedCodec {
                code: self.cid.codec_code(),
            }),
        }
    }

    /// Identifiers embedded as links in this block, in encounter order.
    pub fn links(&self) -> Result<Vec<Identifier>, BlockError> {
        let mut out = Vec::new();
        if let Some(value) = self.decode()? {
            collect_links(&value, &mut out);
        }
        Ok(out)
    }
}

fn collect_links(value: &Ipld, out: &mut Vec<Identifier>) {
    match value {
        Ipld::Link(cid) => out.push(Identifier::from_cid(*cid)),
        Ipld::List(items) => items.iter().for_each(|item| collect_links(item, out)),
        Ipld::Map(map) => map.values().for_each(|item| collect_links(item, out)),
        _ => {}
    }
}

/// An ordered, de-duplicated collection of blocks with designated roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSet {
    roots: Vec<Identifier>,
    blocks: Vec<Block>,
    index: HashMap<Identifier, usize>,
}

impl BlockSet {
    /// Create an empty set with the given roots.
    pub fn new(roots: Vec<Identifier>) -> Self {
        Self {
            roots,
            ..Self::default()
        }
    }

    /// Root identifiers, in declaration order.
    pub fn roots(&self) -> &[Identifier] {
        &self.roots
    }

    /// Replace the root list.
    pub fn set_roots(&mut self, roots: Vec<Identifier>) {
        self.roots = roots;
    }

    /// Insert a block. Returns `false` if a block with the same identifier
    /// was already present; the existing block is kept.
    pub fn insert(&mut self, block: Block) -> bool {
        if self.index.contains_key(block.cid()) {
            return false;
        }
        self.index.insert(*block.cid(), self.blocks.len());
        self.blocks.push(block);
        true
    }

    /// Insert every block from an iterator.
    pub fn extend(&mut self, blocks: impl IntoIterator<Item = Block>) {
        for block in blocks {
            self.insert(block);
        }
    }

    /// Look up a block by identifier.
    pub fn get(&self, cid: &Identifier) -> Option<&Block> {
        self.index.get(cid).map(|&i| &self.blocks[i])
    }

    /// Whether a block with this identifier is present.
    pub fn contains(&self, cid: &Identifier) -> bool {
        self.index.contains_key(cid)
    }

    /// Iterate blocks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Number of distinct blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the set holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total payload bytes across all blocks.
    pub fn byte_len(&self) -> usize {
        self.blocks.iter().map(|b| b.data().len()).sum()
    }

    /// Split into roots and blocks (insertion order).
    pub fn into_parts(self) -> (Vec<Identifier>, Vec<Block>) {
        (self.roots, self.blocks)
    }

    /// Check that every root and every link reachable from a root is present.
    pub fn verify_closure(&self) -> Result<(), BlockError> {
        let mut visited: HashSet<Identifier> = HashSet::new();
        let mut stack: Vec<Identifier> = Vec::new();
        for root in &self.roots {
            if !self.contains(root) {
                return Err(BlockError::MissingRoot(*root));
            }
            stack.push(*root);
        }
        while let Some(cid) = stack.pop() {
            if !visited.insert(cid) {
                continue;
            }
            let Some(block) = self.get(&cid) else {
                continue;
            };
            for link in block.links()? {
                if !self.contains(&link) {
                    return Err(BlockError::DanglingLink {
                        from: cid,
                        missing: link,
                    });
                }
                stack.push(link);
            }
        }
        Ok(())
    }
}

impl IntoIterator for BlockSet {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

impl<'a> IntoIterator for &'a BlockSet {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cid::Cid;
    use std::collections::BTreeMap;

    fn dir(entries: &[(&str, &Block)]) -> Block {
        let map: BTreeMap<String, Cid> = entries
            .iter()
            .map(|(name, block)| (name.to_string(), *block.cid().as_cid()))
            .collect();
        Block::encode(&map).unwrap()
    }

    #[test]
    fn raw_block_satisfies_hash_invariant() {
        let block = Block::raw(&b"leaf"[..]);
        assert!(Block::new(*block.cid(), block.data().clone()).is_ok());
        assert!(block.decode().unwrap().is_none());
        assert!(block.links().unwrap().is_empty());
    }

    #[test]
    fn new_rejects_wrong_bytes() {
        let block = Block::raw(&b"leaf"[..]);
        let err = Block::new(*block.cid(), &b"other"[..]).unwrap_err();
        assert_eq!(err, BlockError::HashMismatch { cid: *block.cid() });
    }

    #[test]
    fn dag_cbor_links_are_extracted() {
        let a = Block::raw(&b"a"[..]);
        let b = Block::raw(&b"b"[..]);
        let root = dir(&[("a.txt", &a), ("b.txt", &b)]);
        let mut links = root.links().unwrap();
        links.sort();
        let mut expected = vec![*a.cid(), *b.cid()];
        expected.sort();
        assert_eq!(links, expected);
    }

    #[test]
    fn insert_deduplicates() {
        let mut set = BlockSet::default();
        assert!(set.insert(Block::raw(&b"x"[..])));
        assert!(!set.insert(Block::raw(&b"x"[..])));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn closure_holds_for_complete_set() {
        let leaf = Block::raw(&b"leaf"[..]);
        let root = dir(&[("leaf", &leaf)]);
        let mut set = BlockSet::new(vec![*root.cid()]);
        set.extend([root, leaf]);
        assert!(set.verify_closure().is_ok());
    }

    #[test]
    fn closure_detects_dangling_link() {
        let leaf = Block::raw(&b"leaf"[..]);
        let root = dir(&[("leaf", &leaf)]);
        let mut set = BlockSet::new(vec![*root.cid()]);
        set.insert(root.clone());
        assert_eq!(
            set.verify_closure(),
            Err(BlockError::DanglingLink {
                from: *root.cid(),
                missing: *leaf.cid()
            })
        );
    }

    #[test]
    fn closure_detects_missing_root() {
        let leaf = Block::raw(&b"leaf"[..]);
        let set = BlockSet::new(vec![*leaf.cid()]);
        assert_eq!(set.verify_closure(), Err(BlockError::MissingRoot(*leaf.cid())));
    }

    #[test]
    fn empty_set_without_roots_is_closed() {
        assert!(BlockSet::default().verify_closure().is_ok());
    }
}
