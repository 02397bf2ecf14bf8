//! # Block Encoder
//!
//! Encodes a job's image into a closed block set and rewrites the metadata's
//! image reference to `ipfs://<directory-root>/<filename>`.
//!
//! ## Preconditions
//!
//! The image must be [`ImageSource::Local`]. Remote URLs and resolved content
//! URIs are rejected with [`EncodeError::InvalidImageSource`]; they have
//! nothing to encode.
//!
//! ## Side Effects
//!
//! Reading the payload is the only I/O. The caller's metadata is never
//! mutated; the resolved copy is returned alongside the blocks.

use bytes::Bytes;
use carpost_core::{
    to_uri, Block, BlockSet, ContentUri, Identifier, ImageSource, LocalFile, Metadata, Payload,
};
use tokio::io::AsyncReadExt;

use crate::error::EncodeError;
use crate::layout::{layout_file, split, Directory, FileLayout};

/// Default leaf size: payloads up to 1 MiB become a single raw leaf.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Entry name of the metadata document inside a job bundle.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Maximum raw leaf size in bytes. Larger payloads are split.
    pub chunk_size: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Result of [`BlockEncoder::encode`].
#[derive(Debug, Clone)]
pub struct Encoded {
    /// Copy of the input metadata with the image resolved.
    pub json: Metadata,
    /// Image directory root plus every block behind it; the root is the
    /// single declared root.
    pub blocks: BlockSet,
    /// Link to the image file itself (raw leaf or file node).
    pub file: Identifier,
    /// Published filename.
    pub filename: String,
}

impl Encoded {
    /// The image directory root.
    pub fn root(&self) -> Identifier {
        self.blocks.roots()[0]
    }
}

/// Result of [`BlockEncoder::bundle`].
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Copy of the input metadata with the image resolved; this is the
    /// document stored as `metadata.json`.
    pub json: Metadata,
    /// Job directory root plus every block behind it.
    pub blocks: BlockSet,
    /// Content URI the image resolves at.
    pub image: ContentUri,
}

impl Bundle {
    /// The job directory root.
    pub fn root(&self) -> Identifier {
        self.blocks.roots()[0]
    }
}

/// Deterministic encoder for job images and job bundles.
#[derive(Debug, Clone, Default)]
pub struct BlockEncoder {
    config: EncoderConfig,
}

impl BlockEncoder {
    /// Create an encoder, rejecting a zero chunk size.
    pub fn new(config: EncoderConfig) -> Result<Self, EncodeError> {
        if config.chunk_size == 0 {
            return Err(EncodeError::InvalidConfig("chunk_size must be greater than zero".into()));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode the metadata's local image.
    ///
    /// Produces a directory `{<filename>: <file link>}` as the single root
    /// and returns the metadata with its image replaced by
    /// `ipfs://<root>/<filename>`.
    pub async fn encode(&self, metadata: &Metadata) -> Result<Encoded, EncodeError> {
        let file = match &metadata.image {
            ImageSource::Local(file) => file,
            other => {
                tracing::warn!(kind = other.kind(), "refusing to encode non-local image");
                return Err(EncodeError::InvalidImageSource { kind: other.kind() });
            }
        };
        validate_filename(&file.name)?;

        let layout = self.layout(file).await?;
        let mut dir = Directory::new();
        dir.insert(file.name.clone(), layout.link);
        let dir_block = dir.to_block()?;
        let root = *dir_block.cid();

        let mut blocks = BlockSet::new(vec![root]);
        blocks.insert(dir_block);
        blocks.extend(layout.blocks);
        blocks.verify_closure()?;

        let mut json = metadata.clone();
        json.image = ImageSource::Resolved(to_uri(&root).join(&file.name).to_string());

        tracing::debug!(
            %root,
            filename = %file.name,
            size = layout.size,
            blocks = blocks.len(),
            "encoded image"
        );

        Ok(Encoded {
            json,
            blocks,
            file: layout.link,
            filename: file.name.clone(),
        })
    }

    /// Encode the image and bundle it with its metadata document.
    ///
    /// The job directory holds `metadata.json` (a raw leaf of the resolved
    /// metadata JSON) and the image under its filename, linking the same file
    /// blocks as the image directory. The job directory is the single root.
    /// The image directory block is carried alongside it so the returned
    /// image URI resolves inside the same block set.
    pub async fn bundle(&self, metadata: &Metadata) -> Result<Bundle, EncodeError> {
        let encoded = self.encode(metadata).await?;
        if encoded.filename == METADATA_FILENAME {
            return Err(EncodeError::InvalidFilename(encoded.filename));
        }
        let image = to_uri(&encoded.root()).join(&encoded.filename);

        let json_leaf = Block::raw(serde_json::to_vec(&encoded.json)?);
        let mut job_dir = Directory::new();
        job_dir.insert(METADATA_FILENAME, *json_leaf.cid());
        job_dir.insert(encoded.filename.clone(), encoded.file);
        let job_block = job_dir.to_block()?;
        let root = *job_block.cid();

        let mut blocks = BlockSet::new(vec![root]);
        blocks.insert(job_block);
        blocks.insert(json_leaf);
        let (_, image_blocks) = encoded.blocks.into_parts();
        blocks.extend(image_blocks);
        blocks.verify_closure()?;

        tracing::info!(%root, %image, blocks = blocks.len(), bytes = blocks.byte_len(), "bundled job");

        Ok(Bundle {
            json: encoded.json,
            blocks,
            image,
        })
    }

    async fn layout(&self, file: &LocalFile) -> Result<FileLayout, EncodeError> {
        let chunks = match &file.payload {
            Payload::Memory(bytes) => split(bytes, self.config.chunk_size),
            Payload::Path(path) => read_chunks(path, self.config.chunk_size)
                .await
                .map_err(|source| EncodeError::PayloadReadError {
                    path: path.clone(),
                    source,
                })?,
        };
        Ok(layout_file(chunks)?)
    }
}

/// Read a file in `chunk_size` pieces so no single allocation exceeds one
/// chunk. Chunk boundaries match [`split`] for the same bytes.
async fn read_chunks(path: &std::path::Path, chunk_size: usize) -> std::io::Result<Vec<Bytes>> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut chunks = Vec::new();
    loop {
        let mut buf = Vec::new();
        let n = (&mut file).take(chunk_size as u64).read_to_end(&mut buf).await?;
        if n == 0 {
            break;
        }
        chunks.push(Bytes::from(buf));
        if n < chunk_size {
            break;
        }
    }
    Ok(chunks)
}

fn validate_filename(name: &str) -> Result<(), EncodeError> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(EncodeError::InvalidFilename(name.to_string()));
    }
    Ok(())
}
