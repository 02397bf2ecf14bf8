//! Typed client for the remote job store and the retrieval gateway.
//!
//! ## API Paths
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/v1/auth` | Exchange a signed Web3-Token for a bearer token |
//! | POST   | `/v1/storeCar` | Upload a CAR archive, returns the stored root |
//! | GET    | `/v1/jobs` | List jobs |
//! | GET    | `/v1/jobs/{cid}` | Get one job (404 is absent) |
//! | GET    | `/v1/jobs?from={address}` | List jobs by author |
//!
//! Metadata documents are fetched unauthenticated from the gateway at
//! `<gateway>/ipfs/<root>/metadata.json`.
//!
//! Nothing here retries; every failure is returned to the caller.

use std::time::Duration;

use carpost_car::{CarStream, CAR_CONTENT_TYPE};
use carpost_core::{to_gateway_url, to_uri, AccountAddress, Identifier, Job, Metadata};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use url::Url;

use crate::auth::Credential;
use crate::config::ClientConfig;
use crate::error::TransportError;

/// HTTP client for the store API and gateway.
#[derive(Debug, Clone)]
pub struct TransportClient {
    http: reqwest::Client,
    api_url: Url,
    gateway: String,
}

impl TransportClient {
    /// Create a client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            gateway: config.gateway.clone(),
        })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Exchange a Web3-Token for a bearer token.
    ///
    /// Calls `POST {api_url}v1/auth` with `Authorization: Web3-Token <token>`.
    /// A non-2xx response is a [`TransportError::FetchError`].
    pub async fn authenticate(&self, web3_token: &str) -> Result<String, TransportError> {
        let endpoint = "POST /v1/auth";
        let url = format!("{}v1/auth", self.api_url);

        let resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Web3-Token {web3_token}"))
            .send()
            .await
            .map_err(|e| TransportError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::FetchError {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        let token = resp.text().await.map_err(|e| TransportError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;
        Ok(token.trim().to_string())
    }

    /// Stream an archive to the store.
    ///
    /// Calls `POST {api_url}v1/storeCar` with the archive as a streamed body.
    /// Returns the root identifier the store confirms.
    pub async fn upload(&self, car: CarStream, credential: &Credential) -> Result<Identifier, TransportError> {
        let endpoint = "POST /v1/storeCar";
        let url = format!("{}v1/storeCar", self.api_url);

        tracing::info!(address = %credential.address(), "uploading archive");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(credential.token())
            .header(CONTENT_TYPE, CAR_CONTENT_TYPE)
            .body(reqwest::Body::wrap_stream(car))
            .send()
            .await
            .map_err(|e| TransportError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status, "archive upload rejected");
            return Err(TransportError::UploadFailed { status, body });
        }

        let text = resp.text().await.map_err(|e| TransportError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;
        let root: Identifier = text.trim().parse().map_err(|e| TransportError::InvalidIdentifier {
            endpoint: endpoint.into(),
            source: e,
        })?;
        tracing::info!(%root, "archive stored");
        Ok(root)
    }

    /// List all jobs, in the store's order.
    ///
    /// Calls `GET {api_url}v1/jobs`.
    pub async fn list_jobs(&self) -> Result<Vec<Job>, TransportError> {
        self.get_list("GET /v1/jobs", format!("{}v1/jobs", self.api_url)).await
    }

    /// List jobs posted by `author`.
    ///
    /// Calls `GET {api_url}v1/jobs?from={author}`.
    pub async fn list_jobs_by_author(&self, author: &AccountAddress) -> Result<Vec<Job>, TransportError> {
        self.get_list(
            "GET /v1/jobs?from",
            format!("{}v1/jobs?from={author}", self.api_url),
        )
        .await
    }

    /// Get one job. A 404 is `Ok(None)`.
    ///
    /// Calls `GET {api_url}v1/jobs/{cid}`.
    pub async fn get_job(&self, cid: &Identifier) -> Result<Option<Job>, TransportError> {
        let endpoint = format!("GET /v1/jobs/{cid}");
        let url = format!("{}v1/jobs/{cid}", self.api_url);

        let resp = self.http.get(&url).send().await.map_err(|e| TransportError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::FetchError {
                endpoint,
                status,
                body,
            });
        }

        resp.json()
            .await
            .map(Some)
            .map_err(|e| TransportError::Deserialization { endpoint, source: e })
    }

    /// Fetch a job's metadata document from the gateway.
    ///
    /// The request goes to `<gateway>/ipfs/<root>/metadata.json`, not
    /// `<gateway>/<root>/metadata.json`: the gateway is addressed through
    /// [`to_gateway_url`], the same path-style rewrite used for image URLs,
    /// so a bare gateway host and a full gateway URL both resolve under
    /// `/ipfs/`.
    pub async fn fetch_metadata(&self, root: &Identifier) -> Result<Metadata, TransportError> {
        let endpoint = format!("GET {root}/metadata.json");
        let url = to_gateway_url(&to_uri(root).join("metadata.json"), &self.gateway)
            .map_err(TransportError::Gateway)?;

        let resp = self.http.get(url).send().await.map_err(|e| TransportError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::FetchError {
                endpoint,
                status,
                body,
            });
        }

        resp.json()
            .await
            .map_err(|e| TransportError::Deserialization { endpoint, source: e })
    }

    async fn get_list(&self, endpoint: &str, url: String) -> Result<Vec<Job>, TransportError> {
        let resp = self.http.get(&url).send().await.map_err(|e| TransportError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::FetchError {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        resp.json().await.map_err(|e| TransportError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
    }
}
