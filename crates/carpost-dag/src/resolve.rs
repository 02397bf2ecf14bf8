//! Walking encoded block sets.
//!
//! Used by `carpost inspect` and by tests to prove that an encoded image is
//! actually reachable at the URI the encoder wrote into the metadata.

use bytes::{Bytes, BytesMut};
use carpost_core::{BlockSet, Codec, Identifier};

use crate::error::ResolveError;
use crate::layout::{Directory, FileNode};

/// Follow a `/`-separated path of directory entries from `root`.
///
/// Empty segments are ignored, so `""`, `"/"` and `"/a//b"` are all valid.
pub fn resolve_path(blocks: &BlockSet, root: &Identifier, path: &str) -> Result<Identifier, ResolveError> {
    let mut current = *root;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let block = blocks
            .get(&current)
            .ok_or(ResolveError::MissingBlock(current))?;
        let dir = Directory::from_block(block)?;
        current = *dir.get(segment).ok_or_else(|| ResolveError::NotFound {
            directory: current,
            segment: segment.to_string(),
        })?;
    }
    Ok(current)
}

/// Reassemble a file's bytes from a raw leaf or a file node.
pub fn read_file(blocks: &BlockSet, cid: &Identifier) -> Result<Bytes, ResolveError> {
    let block = blocks.get(cid).ok_or(ResolveError::MissingBlock(*cid))?;
    match cid.codec() {
        Some(Codec::Raw) => Ok(block.data().clone()),
        Some(Codec::DagCbor) => {
            let node = FileNode::from_block(block)?;
            let mut out = BytesMut::with_capacity(usize::try_from(node.size).unwrap_or(0));
            for part in &node.parts {
                let leaf = blocks.get(part).ok_or(ResolveError::MissingBlock(*part))?;
                if leaf.cid().codec() != Some(Codec::Raw) {
                    return Err(ResolveError::Malformed {
                        cid: *part,
                        expected: "raw leaf",
                    });
                }
                out.extend_from_slice(leaf.data());
            }
            if out.len() as u64 != node.size {
                return Err(ResolveError::Malformed {
                    cid: *cid,
                    expected: "file node whose size matches its parts",
                });
            }
            Ok(out.freeze())
        }
        None => Err(ResolveError::Malformed {
            cid: *cid,
            expected: "file",
        }),
    }
}
