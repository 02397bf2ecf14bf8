//! End-to-end job posting.
//!
//! `bundle → ensure_auth → pack → upload`. Any failure stops the flow; the
//! job is published only when the store confirms exactly the root that was
//! uploaded.

use std::sync::Arc;

use carpost_car::pack_block_set;
use carpost_core::{ContentUri, Identifier, Metadata};
use carpost_dag::BlockEncoder;

use crate::auth::{AuthenticationBroker, Signer};
use crate::error::PublishError;
use crate::transport::TransportClient;

/// A job the store has accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Root of the stored job directory.
    pub root: Identifier,
    /// The metadata document as stored, with the image resolved.
    pub json: Metadata,
    /// Content URI of the image.
    pub image: ContentUri,
}

/// Posts jobs: encodes, authenticates and uploads.
#[derive(Debug, Clone)]
pub struct JobPublisher {
    encoder: BlockEncoder,
    broker: AuthenticationBroker,
    transport: TransportClient,
}

impl JobPublisher {
    pub fn new(encoder: BlockEncoder, broker: AuthenticationBroker, transport: TransportClient) -> Self {
        Self {
            encoder,
            broker,
            transport,
        }
    }

    pub fn broker(&self) -> &AuthenticationBroker {
        &self.broker
    }

    /// Publish a job whose image is a local payload.
    ///
    /// The cached credential is invalidated only when the store rejects it
    /// (401/403); other upload failures leave it in place.
    pub async fn publish(&self, metadata: &Metadata, signer: Arc<dyn Signer>) -> Result<Published, PublishError> {
        let bundle = self.encoder.bundle(metadata).await?;
        let expected = bundle.root();
        let credential = self.broker.ensure_auth(signer).await?;

        let car = pack_block_set(&bundle.blocks);
        let confirmed = match self.transport.upload(car, &credential).await {
            Ok(root) => root,
            Err(e) => {
                if e.is_auth_failure() {
                    self.broker.invalidate(credential.address()).await;
                }
                return Err(e.into());
            }
        };

        if confirmed != expected {
            tracing::warn!(%expected, %confirmed, "store confirmed a different root");
            return Err(PublishError::RootMismatch { expected, confirmed });
        }

        tracing::info!(root = %expected, image = %bundle.image, "job published");
        Ok(Published {
            root: expected,
            json: bundle.json,
            image: bundle.image,
        })
    }
}
