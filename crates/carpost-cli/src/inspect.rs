//! # Inspect Subcommand
//!
//! Reads a CAR file, prints its header and blocks, and checks that every
//! root and link resolves inside the archive. With `--path`, resolves a
//! file below the first root and prints or extracts it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use carpost_car::CarReader;
use carpost_core::Codec;
use carpost_dag::{read_file, resolve_path, Directory};

/// Arguments for the `carpost inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Archive to read.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Path of a file below the first root, e.g. `cat.png`.
    #[arg(long)]
    pub path: Option<String>,

    /// Write the resolved file here instead of summarizing it.
    #[arg(long, value_name = "FILE", requires = "path")]
    pub extract: Option<PathBuf>,
}

/// Execute the inspect subcommand.
pub async fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let reader =
        CarReader::from_bytes(data).with_context(|| format!("{} is not a valid archive", args.file.display()))?;

    println!("version: {}", reader.header().version());
    for root in reader.roots() {
        println!("root:    {root}");
    }
    println!("blocks:  {}", reader.blocks().len());
    for block in reader.blocks() {
        let codec = block.cid().codec().map(Codec::as_str).unwrap_or("unknown");
        println!("  {} {codec} {} bytes", block.cid(), block.data().len());
    }

    let set = reader.into_block_set();
    if let Err(e) = set.verify_closure() {
        println!("FAIL: {e}");
        return Ok(1);
    }
    println!("OK: archive is closed");

    let root = *set.roots().first().context("archive has no roots")?;
    if let Some(dir) = set.get(&root).and_then(|b| Directory::from_block(b).ok()) {
        for (name, cid) in dir.entries() {
            println!("  /{name} -> {cid}");
        }
    }

    let Some(path) = &args.path else {
        return Ok(0);
    };
    let cid = resolve_path(&set, &root, path).with_context(|| format!("failed to resolve {path}"))?;
    let bytes = read_file(&set, &cid).with_context(|| format!("failed to read {path}"))?;
    match &args.extract {
        Some(out) => {
            tokio::fs::write(out, &bytes)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("OK: extracted {path} ({} bytes) to {}", bytes.len(), out.display());
        }
        None => println!("{path}: {cid} ({} bytes)", bytes.len()),
    }
    Ok(0)
}
