//! Credential persistence.
//!
//! Credentials outlive a single process so a user is not asked to sign a
//! fresh challenge on every invocation. Entries are keyed
//! `authjwt.<address>`. Expired entries are never returned.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use carpost_core::AccountAddress;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::auth::token::Credential;
use crate::error::StoreError;

/// Storage key for an account's credential.
pub fn storage_key(address: &AccountAddress) -> String {
    format!("authjwt.{address}")
}

/// Where the broker persists credentials between runs.
///
/// The broker never holds its own locks while awaiting these methods.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// A non-expired credential for `address`, if one is stored.
    async fn load(&self, address: &AccountAddress) -> Result<Option<Credential>, StoreError>;

    /// Store or replace the credential for its address.
    async fn save(&self, credential: &Credential) -> Result<(), StoreError>;

    /// Forget the credential for `address`.
    async fn remove(&self, address: &AccountAddress) -> Result<(), StoreError>;
}

/// Process-local store. The default for [`AuthenticationBroker`](crate::AuthenticationBroker).
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self, address: &AccountAddress) -> Result<Option<Credential>, StoreError> {
        Ok(self
            .entries
            .lock()
            .get(&storage_key(address))
            .filter(|c| c.is_valid())
            .cloned())
    }

    async fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        self.entries
            .lock()
            .insert(storage_key(credential.address()), credential.clone());
        Ok(())
    }

    async fn remove(&self, address: &AccountAddress) -> Result<(), StoreError> {
        self.entries.lock().remove(&storage_key(address));
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredCredential {
    token: String,
    address: AccountAddress,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// JSON file of `{"authjwt.<address>": {token, address, issued_at, expires_at}}`.
///
/// Every operation reads the whole file; the file is rewritten on change
/// through a temporary file and a rename, so a reader never sees a partial
/// write. Expired entries are dropped on the next write.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: tokio::sync::Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, StoredCredential>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, entries: &BTreeMap<String, StoredCredential>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, serde_json::to_vec_pretty(entries)?).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, address: &AccountAddress) -> Result<Option<Credential>, StoreError> {
        let _guard = self.lock.lock().await;
        let entries = self.read_all().await?;
        Ok(entries
            .get(&storage_key(address))
            .filter(|s| s.address == *address)
            .map(|s| Credential::new(s.token.clone(), s.address, s.issued_at, s.expires_at))
            .filter(Credential::is_valid))
    }

    async fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        let now = Utc::now();
        entries.retain(|_, s| now < s.expires_at);
        entries.insert(
            storage_key(credential.address()),
            StoredCredential {
                token: credential.token().to_string(),
                address: *credential.address(),
                issued_at: credential.issued_at(),
                expires_at: credential.expires_at(),
            },
        );
        self.write_all(&entries).await?;
        tracing::debug!(path = %self.path.display(), address = %credential.address(), "persisted credential");
        Ok(())
    }

    async fn remove(&self, address: &AccountAddress) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        if entries.remove(&storage_key(address)).is_some() {
            self.write_all(&entries).await?;
        }
        Ok(())
    }
}
