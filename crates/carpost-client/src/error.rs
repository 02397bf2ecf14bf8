//! Client error types.

use carpost_core::{Identifier, ParseError};
use carpost_dag::EncodeError;

/// Errors from calls to the remote store or gateway.
///
/// Nothing here is retried by the client.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// `POST /v1/storeCar` returned a non-2xx status.
    #[error("archive upload returned {status}: {body}")]
    UploadFailed { status: u16, body: String },

    /// A read or auth endpoint returned a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    FetchError {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The store answered with text that is not an identifier.
    #[error("{endpoint} returned an invalid identifier: {source}")]
    InvalidIdentifier {
        endpoint: String,
        source: ParseError,
    },

    /// The gateway URL for a fetch could not be built.
    #[error("cannot build gateway URL: {0}")]
    Gateway(ParseError),
}

impl TransportError {
    /// Whether the store rejected the upload's credential.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::UploadFailed { status: 401 | 403, .. })
    }
}

/// Errors obtaining a credential.
///
/// `Clone` so every caller waiting on one exchange receives the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// `POST /v1/auth` answered with a non-2xx status.
    #[error("authentication rejected ({status}): {body}")]
    AuthRejected { status: u16, body: String },

    /// The signer refused, failed, timed out, or the exchange was cancelled.
    #[error("signer declined: {0}")]
    SignerDeclined(String),

    /// The auth endpoint could not be reached. Safe to retry manually.
    #[error("network error during authentication: {0}")]
    NetworkError(String),
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::FetchError { status, body, .. } => Self::AuthRejected { status, body },
            other => Self::NetworkError(other.to_string()),
        }
    }
}

/// Errors from a [`Signer`](crate::auth::Signer).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    /// The user or device refused to sign.
    #[error("signature request declined: {0}")]
    Declined(String),

    /// Key material is unusable.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// A signature could not be produced or parsed.
    #[error("signature error: {0}")]
    Signature(String),
}

/// Errors from the credential persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential store is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from [`JobPublisher::publish`](crate::JobPublisher::publish).
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The store confirmed a root other than the one uploaded.
    #[error("store confirmed root {confirmed}, expected {expected}")]
    RootMismatch {
        expected: Identifier,
        confirmed: Identifier,
    },
}
