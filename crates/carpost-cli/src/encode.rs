//! # Encode Subcommand
//!
//! Bundles a job offline: the metadata document and its image become one
//! job directory, packed into a CAR file that `carpost inspect` can read
//! back or any CAR-aware store can ingest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use carpost_car::pack_block_set;

use crate::JobArgs;

/// Arguments for the `carpost encode` subcommand.
#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Where to write the archive.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

/// Execute the encode subcommand.
pub async fn run_encode(args: &EncodeArgs) -> Result<u8> {
    let encoder = args.job.encoder()?;
    let bundle = encoder
        .bundle(&args.job.metadata())
        .await
        .context("failed to encode job")?;

    let bytes = pack_block_set(&bundle.blocks)
        .into_bytes()
        .await
        .context("failed to pack archive")?;
    tokio::fs::write(&args.output, &bytes)
        .await
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!("OK: root={}", bundle.root());
    println!("  image:  {}", bundle.image);
    println!("  blocks: {} ({} bytes)", bundle.blocks.len(), bytes.len());
    println!("  output: {}", args.output.display());
    Ok(0)
}
