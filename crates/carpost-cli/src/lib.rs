//! # carpost-cli — Command-line front end
//!
//! Provides the `carpost` binary.
//!
//! ## Subcommands
//!
//! - `carpost encode` — Bundle a job and its image into a CAR file.
//! - `carpost inspect` — Print an archive's roots and blocks, check closure
//!   and read files out of it.
//! - `carpost post` — Authenticate and publish a job to the remote store.
//! - `carpost jobs` — List posted jobs and fetch their metadata.
//! - `carpost resolve` — Turn an identifier or content URI into a gateway URL.
//!
//! ```bash
//! carpost encode --name "Rust engineer" --description "..." --image cat.png -o job.car
//! carpost inspect job.car --path cat.png --extract out.png
//! CARPOST_API_URL=https://api.example.org carpost post --name ... --image cat.png
//! carpost jobs list --from 0x2c7536e3605d9c16a7a3d7b1898e529396a65c23
//! ```

pub mod encode;
pub mod inspect;
pub mod jobs;
pub mod post;
pub mod resolve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use carpost_core::{ImageSource, LocalFile, Metadata, Properties};
use carpost_dag::{BlockEncoder, EncoderConfig, DEFAULT_CHUNK_SIZE};

/// Job metadata flags shared by `encode` and `post`.
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Job title.
    #[arg(long)]
    pub name: String,
    /// Short description.
    #[arg(long)]
    pub description: String,
    /// Image file to publish alongside the metadata.
    #[arg(long, value_name = "FILE")]
    pub image: PathBuf,
    /// Tag (repeatable).
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
    /// Full job description.
    #[arg(long, default_value = "")]
    pub content: String,
    #[arg(long, default_value = "")]
    pub payment: String,
    #[arg(long, default_value = "")]
    pub location: String,
    /// Leaf size in bytes for the image file.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

impl JobArgs {
    /// The metadata document these flags describe, image still local.
    pub fn metadata(&self) -> Metadata {
        Metadata {
            name: self.name.clone(),
            description: self.description.clone(),
            image: ImageSource::Local(LocalFile::from_path(&self.image)),
            properties: Properties {
                tags: self.tags.clone(),
                content: self.content.clone(),
                payment: self.payment.clone(),
                location: self.location.clone(),
            },
        }
    }

    pub fn encoder(&self) -> Result<BlockEncoder> {
        BlockEncoder::new(EncoderConfig {
            chunk_size: self.chunk_size,
        })
        .context("invalid --chunk-size")
    }
}

/// Job flags for an image at `image`, used across the subcommand tests.
#[cfg(test)]
pub(crate) fn sample_job(image: impl Into<PathBuf>) -> JobArgs {
    JobArgs {
        name: "Rust engineer".into(),
        description: "Streaming uploads".into(),
        image: image.into(),
        tags: vec!["rust".into()],
        content: "Details".into(),
        payment: "100 DAI".into(),
        location: "Remote".into(),
        chunk_size: DEFAULT_CHUNK_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carpost_core::Payload;

    #[test]
    fn metadata_uses_file_name_of_image() {
        let metadata = sample_job("assets/cat.png").metadata();
        match metadata.image {
            ImageSource::Local(file) => {
                assert_eq!(file.name, "cat.png");
                assert_eq!(file.payload, Payload::Path(PathBuf::from("assets/cat.png")));
            }
            other => panic!("expected a local image, got {other:?}"),
        }
        assert_eq!(metadata.properties.tags, vec!["rust"]);
        assert_eq!(metadata.properties.payment, "100 DAI");
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let args = JobArgs {
            chunk_size: 0,
            ..sample_job("cat.png")
        };
        assert!(args.encoder().is_err());
    }
}
