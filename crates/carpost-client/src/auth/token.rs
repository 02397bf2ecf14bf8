//! Web3-Token challenges and bearer credentials.
//!
//! A challenge is a human-readable message in the Web3-Token v2 layout:
//!
//! ```text
//! api.example.org wants you to sign in with your Ethereum account:
//! 0x2c7536E3605D9C16a7a3D7b1898e529396a65c23
//!
//! Please sign this message to authenticate with the API server
//!
//! URI: https://api.example.org
//! Web3 Token Version: 2
//! Nonce: 41830276
//! Issued At: 2026-10-16T12:00:00.000Z
//! Expiration Time: 2026-10-23T12:00:00.000Z
//! ```
//!
//! The address is written in its EIP-55 checksummed form. The domain line
//! and `URI` line are omitted when no domain is configured.
//! The signed token sent to `POST /v1/auth` is
//! `base64(JSON {"signature": <0x-hex>, "body": <message>})`.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use carpost_core::AccountAddress;
use chrono::{DateTime, SecondsFormat, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Statement embedded in every challenge unless overridden.
pub const DEFAULT_STATEMENT: &str = "Please sign this message to authenticate with the API server";

/// Parameters shared by every challenge a broker issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeParams {
    pub statement: String,
    pub expires_in: chrono::Duration,
    pub domain: Option<String>,
}

impl Default for ChallengeParams {
    fn default() -> Self {
        Self {
            statement: DEFAULT_STATEMENT.to_string(),
            expires_in: chrono::Duration::days(7),
            domain: None,
        }
    }
}

/// One challenge, bound to an account address and a validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub address: AccountAddress,
    pub statement: String,
    pub domain: Option<String>,
    pub nonce: u32,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    /// Build a challenge issued at `now` with a random nonce.
    pub fn new(address: AccountAddress, params: &ChallengeParams, now: DateTime<Utc>) -> Self {
        Self {
            address,
            statement: params.statement.clone(),
            domain: params.domain.clone(),
            nonce: OsRng.next_u32() % 100_000_000,
            issued_at: now,
            expires_at: now + params.expires_in,
        }
    }

    /// The message the signer is asked to sign.
    pub fn body(&self) -> String {
        let mut lines = Vec::with_capacity(10);
        if let Some(domain) = &self.domain {
            lines.push(format!("{domain} wants you to sign in with your Ethereum account:"));
        }
        lines.push(self.address.to_checksum());
        lines.push(String::new());
        if !self.statement.is_empty() {
            lines.push(self.statement.clone());
            lines.push(String::new());
        }
        if let Some(domain) = &self.domain {
            lines.push(format!("URI: https://{domain}"));
        }
        lines.push("Web3 Token Version: 2".to_string());
        lines.push(format!("Nonce: {}", self.nonce));
        lines.push(format!("Issued At: {}", iso(self.issued_at)));
        lines.push(format!("Expiration Time: {}", iso(self.expires_at)));
        lines.join("\n")
    }
}

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Serialize)]
struct TokenEnvelope<'a> {
    signature: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct OwnedEnvelope {
    signature: String,
    body: String,
}

/// Pack a signature and the signed message into a Web3-Token.
pub fn encode_token(signature: &str, body: &str) -> String {
    // Serializing two string fields cannot fail.
    let json = serde_json::to_vec(&TokenEnvelope { signature, body }).unwrap_or_default();
    STANDARD.encode(json)
}

/// Unpack a Web3-Token into `(signature, body)`.
pub fn decode_token(token: &str) -> Option<(String, String)> {
    let json = STANDARD.decode(token.trim()).ok()?;
    let envelope: OwnedEnvelope = serde_json::from_slice(&json).ok()?;
    Some((envelope.signature, envelope.body))
}

/// A bearer credential issued by the store.
///
/// `Debug` redacts the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: Zeroizing<String>,
    address: AccountAddress,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(
        token: impl Into<String>,
        address: AccountAddress,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
            address,
            issued_at,
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn address(&self) -> &AccountAddress {
        &self.address
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the credential may still be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("address", &self.address)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
