//! # carpost CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use carpost_cli::encode::{run_encode, EncodeArgs};
use carpost_cli::inspect::{run_inspect, InspectArgs};
use carpost_cli::jobs::{run_jobs, JobsArgs};
use carpost_cli::post::{run_post, PostArgs};
use carpost_cli::resolve::{run_resolve, ResolveArgs};

/// carpost: content-addressed job posting.
///
/// Encodes job metadata and images into verifiable blocks, packs them into
/// CAR archives and streams them to an authenticated remote store.
#[derive(Parser, Debug)]
#[command(name = "carpost", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bundle a job and its image into a CAR file.
    Encode(EncodeArgs),

    /// Print and verify the contents of a CAR file.
    Inspect(InspectArgs),

    /// Authenticate and publish a job to the remote store.
    Post(PostArgs),

    /// List posted jobs and fetch their metadata.
    Jobs(JobsArgs),

    /// Resolve an identifier or content URI to a gateway URL.
    Resolve(ResolveArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!("carpost CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match &cli.command {
        Commands::Encode(args) => run_encode(args).await,
        Commands::Inspect(args) => run_inspect(args).await,
        Commands::Post(args) => run_post(args).await,
        Commands::Jobs(args) => run_jobs(args).await,
        Commands::Resolve(args) => run_resolve(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
