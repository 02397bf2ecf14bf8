//! # carpost-client — Authenticated transport
//!
//! Talks to the remote job store:
//! - **Authentication** via signed Web3-Token challenges exchanged for bearer
//!   tokens at `POST /v1/auth`, cached per account by
//!   [`AuthenticationBroker`].
//! - **Uploads** of streamed CAR archives to `POST /v1/storeCar`.
//! - **Listings** of posted jobs at `GET /v1/jobs`.
//! - **Metadata** fetched from a retrieval gateway.
//!
//! [`JobPublisher`] ties these to the block encoder and archive packer to
//! post a job end to end.
//!
//! ## Retry Policy
//!
//! None. Authentication, upload and fetch failures are surfaced to the
//! caller unchanged. The broker always leaves an address unauthenticated
//! after a failed exchange so the next call starts clean.

pub mod auth;
pub mod config;
pub mod error;
pub mod publish;
pub mod transport;

pub use auth::{
    AuthState, AuthenticationBroker, Credential, CredentialStore, FileCredentialStore, LocalKeySigner,
    MemoryCredentialStore, Signer,
};
pub use config::{ClientConfig, ConfigError};
pub use error::{AuthError, PublishError, SignerError, StoreError, TransportError};
pub use publish::{JobPublisher, Published};
pub use transport::TransportClient;
