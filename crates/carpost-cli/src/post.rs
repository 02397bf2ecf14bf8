//! # Post Subcommand
//!
//! Publishes a job to the remote store: bundle, authenticate with a local
//! secp256k1 key, stream the archive and confirm the root. Store settings
//! come from `CARPOST_*` environment variables (see
//! [`ClientConfig::from_env`]).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use carpost_client::{
    AuthenticationBroker, ClientConfig, FileCredentialStore, JobPublisher, LocalKeySigner, Signer, TransportClient,
};
use carpost_core::{to_gateway_url, to_uri};
use carpost_dag::METADATA_FILENAME;

use crate::JobArgs;

/// Arguments for the `carpost post` subcommand.
#[derive(Args)]
pub struct PostArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Hex-encoded secp256k1 key that signs the authentication challenge.
    #[arg(long, env = "CARPOST_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Keep bearer credentials in this JSON file between runs.
    #[arg(long, value_name = "FILE", env = "CARPOST_CREDENTIALS")]
    pub credentials: Option<PathBuf>,
}

impl fmt::Debug for PostArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostArgs")
            .field("job", &self.job)
            .field("private_key", &"[REDACTED]")
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Execute the post subcommand.
pub async fn run_post(args: &PostArgs) -> Result<u8> {
    let config = ClientConfig::from_env().context("failed to load client configuration")?;
    let signer = LocalKeySigner::from_hex(&args.private_key).context("invalid private key")?;
    let transport = TransportClient::new(&config).context("failed to build HTTP client")?;

    let broker = match &args.credentials {
        Some(path) => {
            AuthenticationBroker::with_store(&config, transport.clone(), Arc::new(FileCredentialStore::new(path)))
        }
        None => AuthenticationBroker::from_config(&config, transport.clone()),
    };
    let publisher = JobPublisher::new(args.job.encoder()?, broker, transport);

    tracing::info!(author = %signer.address(), api = %config.api_url, "posting job");
    let published = publisher
        .publish(&args.job.metadata(), Arc::new(signer))
        .await
        .context("failed to post job")?;

    println!("OK: root={}", published.root);
    println!("  image:    {}", published.image);
    let metadata_uri = to_uri(&published.root).join(METADATA_FILENAME);
    match to_gateway_url(&metadata_uri, &config.gateway) {
        Ok(url) => println!("  metadata: {url}"),
        Err(_) => println!("  metadata: {metadata_uri}"),
    }
    Ok(0)
}
