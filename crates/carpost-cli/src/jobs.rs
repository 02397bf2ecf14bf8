//! # Jobs Subcommand
//!
//! Read-only access to posted jobs: listings from the store and metadata
//! documents from the retrieval gateway.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use carpost_client::{ClientConfig, TransportClient};
use carpost_core::{AccountAddress, Identifier, Job, JobRepository};

/// Arguments for the `carpost jobs` subcommand.
#[derive(Args, Debug)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub command: JobsCommand,
}

/// Jobs subcommands.
#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// List posted jobs, optionally for one author.
    List {
        /// Only jobs posted by this account.
        #[arg(long, value_name = "ADDRESS")]
        from: Option<AccountAddress>,
    },

    /// Look up one job by its root identifier.
    Get {
        #[arg(value_name = "CID")]
        cid: Identifier,
    },

    /// Fetch a job's metadata document through the gateway.
    Metadata {
        #[arg(value_name = "CID")]
        cid: Identifier,
    },
}

/// Execute the jobs subcommand.
pub async fn run_jobs(args: &JobsArgs) -> Result<u8> {
    let config = ClientConfig::from_env().context("failed to load client configuration")?;
    let transport = TransportClient::new(&config).context("failed to build HTTP client")?;
    dispatch(&args.command, &transport, &JobRepository::new()).await
}

async fn dispatch(command: &JobsCommand, transport: &TransportClient, repository: &JobRepository) -> Result<u8> {
    match command {
        JobsCommand::List { from } => cmd_list(transport, repository, from.as_ref()).await,
        JobsCommand::Get { cid } => cmd_get(transport, repository, cid).await,
        JobsCommand::Metadata { cid } => cmd_metadata(transport, cid).await,
    }
}

async fn cmd_list(
    transport: &TransportClient,
    repository: &JobRepository,
    from: Option<&AccountAddress>,
) -> Result<u8> {
    let listed = match from {
        Some(author) => transport.list_jobs_by_author(author).await,
        None => transport.list_jobs().await,
    }
    .context("failed to list jobs")?;

    let jobs = repository.intern_all(listed);
    for job in &jobs {
        print_job(job);
    }
    tracing::info!(count = jobs.len(), "listed jobs");
    Ok(0)
}

async fn cmd_get(transport: &TransportClient, repository: &JobRepository, cid: &Identifier) -> Result<u8> {
    match transport.get_job(cid).await.context("failed to fetch job")? {
        Some(job) => {
            print_job(&repository.intern(job));
            Ok(0)
        }
        None => {
            println!("NOT FOUND: {cid}");
            Ok(1)
        }
    }
}

async fn cmd_metadata(transport: &TransportClient, cid: &Identifier) -> Result<u8> {
    let metadata = transport
        .fetch_metadata(cid)
        .await
        .with_context(|| format!("failed to fetch metadata for {cid}"))?;

    println!("{}", serde_json::to_string_pretty(&metadata)?);
    if let Some(url) = metadata
        .image_url(transport.gateway())
        .context("metadata has an unusable image reference")?
    {
        println!("image: {url}");
    }
    Ok(0)
}

fn print_job(job: &Job) {
    println!("{} author={} block={}", job.cid, job.author, job.block);
}
