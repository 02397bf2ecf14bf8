//! # Authentication Broker
//!
//! Obtains and caches bearer credentials, one account at a time.
//!
//! ## State Machine (per account address)
//!
//! ```text
//! Unauthenticated ──ensure_auth──▶ Challenging ──accepted──▶ Authenticated
//!        ▲                             │                          │
//!        └──── rejected / declined / ──┘                          │
//!        │     cancelled / timed out                              │
//!        └──────────────── expired / invalidated ─────────────────┘
//! ```
//!
//! ## De-duplication
//!
//! While an exchange is in flight the address's slot holds a shared future.
//! Every concurrent `ensure_auth` for that address awaits the same future,
//! so the signer is prompted once and all callers see the same outcome. The
//! future settles the slot itself when it completes, so the result is
//! recorded even if the caller that started it dropped out while others
//! kept waiting.
//!
//! The slot map is guarded by a `parking_lot` mutex that is never held
//! across an `.await`. Credential store reads and writes happen outside it,
//! so a slow store delays only the address being looked up.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use carpost_core::AccountAddress;
use chrono::Utc;
use futures::future::{AbortHandle, Abortable, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use crate::auth::signer::Signer;
use crate::auth::store::{CredentialStore, MemoryCredentialStore};
use crate::auth::token::{encode_token, Challenge, ChallengeParams, Credential};
use crate::config::ClientConfig;
use crate::error::AuthError;
use crate::transport::TransportClient;

type Exchange = Shared<BoxFuture<'static, Result<Credential, AuthError>>>;

/// What a caller can use without touching the store.
enum Cached {
    Ready(Credential),
    Joining(Exchange),
}

fn lookup(slots: &HashMap<AccountAddress, Slot>, address: &AccountAddress) -> Option<Cached> {
    match slots.get(address) {
        Some(Slot::Ready(credential)) if credential.is_valid() => Some(Cached::Ready(credential.clone())),
        Some(Slot::Pending { exchange, .. }) => Some(Cached::Joining(exchange.clone())),
        _ => None,
    }
}

enum Slot {
    Ready(Credential),
    Pending {
        id: u64,
        exchange: Exchange,
        abort: AbortHandle,
    },
}

/// Observable authentication state of one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Challenging,
    Authenticated,
}

/// Per-address credential cache with in-flight request de-duplication.
///
/// Cloning shares the cache.
#[derive(Clone)]
pub struct AuthenticationBroker {
    transport: TransportClient,
    params: ChallengeParams,
    sign_timeout: Duration,
    store: Arc<dyn CredentialStore>,
    slots: Arc<Mutex<HashMap<AccountAddress, Slot>>>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for AuthenticationBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationBroker")
            .field("params", &self.params)
            .field("sign_timeout", &self.sign_timeout)
            .field("slots", &self.slots.lock().len())
            .finish_non_exhaustive()
    }
}

impl AuthenticationBroker {
    pub fn new(
        transport: TransportClient,
        params: ChallengeParams,
        sign_timeout: Duration,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            transport,
            params,
            sign_timeout,
            store,
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Build a broker from configuration with an in-memory store.
    pub fn from_config(config: &ClientConfig, transport: TransportClient) -> Self {
        Self::with_store(config, transport, Arc::new(MemoryCredentialStore::new()))
    }

    /// Build a broker from configuration with a caller-supplied store.
    pub fn with_store(
        config: &ClientConfig,
        transport: TransportClient,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let params = ChallengeParams {
            domain: config.auth_domain.clone(),
            expires_in: config.auth_expires_in,
            ..ChallengeParams::default()
        };
        Self::new(transport, params, config.sign_timeout(), store)
    }

    /// Return a valid credential for the signer's account, running at most
    /// one challenge-signature exchange per address at a time.
    pub async fn ensure_auth(&self, signer: Arc<dyn Signer>) -> Result<Credential, AuthError> {
        let address = signer.address();
        let cached = lookup(&self.slots.lock(), &address);
        match cached {
            Some(Cached::Ready(credential)) => return Ok(credential),
            Some(Cached::Joining(exchange)) => {
                tracing::debug!(%address, "joining in-flight authentication");
                return exchange.await;
            }
            None => {}
        }

        // The slot may change while the store is read; it is checked again below.
        let persisted = self.load_persisted(&address).await;

        let exchange = {
            let mut slots = self.slots.lock();
            match lookup(&slots, &address) {
                Some(Cached::Ready(credential)) => return Ok(credential),
                Some(Cached::Joining(exchange)) => exchange,
                None => {
                    if slots.remove(&address).is_some() {
                        tracing::info!(%address, "credential expired");
                    }
                    match persisted {
                        Some(credential) => {
                            slots.insert(address, Slot::Ready(credential.clone()));
                            return Ok(credential);
                        }
                        None => self.start_exchange(&mut slots, signer),
                    }
                }
            }
        };
        exchange.await
    }

    async fn load_persisted(&self, address: &AccountAddress) -> Option<Credential> {
        match self.store.load(address).await {
            Ok(Some(credential)) if credential.is_valid() => {
                tracing::debug!(%address, "loaded persisted credential");
                Some(credential)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(%address, error = %e, "ignoring unreadable credential store");
                None
            }
        }
    }

    fn start_exchange(
        &self,
        slots: &mut HashMap<AccountAddress, Slot>,
        signer: Arc<dyn Signer>,
    ) -> Exchange {
        let address = signer.address();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (abort, registration) = AbortHandle::new_pair();

        let run = exchange(
            self.transport.clone(),
            self.params.clone(),
            self.sign_timeout,
            Arc::clone(&self.store),
            signer,
        );
        let slots_ref = Arc::clone(&self.slots);
        let exchange = async move {
            let result = match Abortable::new(run, registration).await {
                Ok(result) => result,
                Err(_) => Err(AuthError::SignerDeclined("authentication cancelled".into())),
            };
            let mut slots = slots_ref.lock();
            if matches!(slots.get(&address), Some(Slot::Pending { id: current, .. }) if *current == id) {
                match &result {
                    Ok(credential) => {
                        slots.insert(address, Slot::Ready(credential.clone()));
                    }
                    Err(_) => {
                        slots.remove(&address);
                    }
                }
            }
            result
        }
        .boxed()
        .shared();

        tracing::info!(%address, "authentication challenge started");
        slots.insert(
            address,
            Slot::Pending {
                id,
                exchange: exchange.clone(),
                abort,
            },
        );
        exchange
    }

    /// Drop the cached credential for `address`, here and in the store.
    ///
    /// An in-flight exchange is left alone.
    pub async fn invalidate(&self, address: &AccountAddress) {
        let removed = {
            let mut slots = self.slots.lock();
            matches!(slots.get(address), Some(Slot::Ready(_))) && slots.remove(address).is_some()
        };
        if removed {
            tracing::info!(%address, "credential invalidated");
        }
        if let Err(e) = self.store.remove(address).await {
            tracing::warn!(%address, error = %e, "failed to remove persisted credential");
        }
    }

    /// Abort an in-flight exchange. Every waiter receives
    /// [`AuthError::SignerDeclined`] and the address returns to
    /// unauthenticated. Returns whether an exchange was pending.
    pub fn cancel(&self, address: &AccountAddress) -> bool {
        let mut slots = self.slots.lock();
        if let Some(Slot::Pending { abort, .. }) = slots.get(address) {
            abort.abort();
            slots.remove(address);
            tracing::info!(%address, "authentication cancelled");
            true
        } else {
            false
        }
    }

    /// Current state of `address`.
    pub fn state(&self, address: &AccountAddress) -> AuthState {
        match self.slots.lock().get(address) {
            Some(Slot::Ready(credential)) if credential.is_valid() => AuthState::Authenticated,
            Some(Slot::Pending { .. }) => AuthState::Challenging,
            _ => AuthState::Unauthenticated,
        }
    }
}

async fn exchange(
    transport: TransportClient,
    params: ChallengeParams,
    sign_timeout: Duration,
    store: Arc<dyn CredentialStore>,
    signer: Arc<dyn Signer>,
) -> Result<Credential, AuthError> {
    let address = signer.address();
    let challenge = Challenge::new(address, &params, Utc::now());
    let body = challenge.body();

    let signature = match tokio::time::timeout(sign_timeout, signer.sign_message(&body)).await {
        Ok(Ok(signature)) => signature,
        Ok(Err(e)) => {
            tracing::warn!(%address, error = %e, "signer declined challenge");
            return Err(AuthError::SignerDeclined(e.to_string()));
        }
        Err(_) => {
            tracing::warn!(%address, timeout = ?sign_timeout, "signer timed out");
            return Err(AuthError::SignerDeclined(format!(
                "no signature within {}s",
                sign_timeout.as_secs_f32()
            )));
        }
    };

    let token = transport
        .authenticate(&encode_token(&signature, &body))
        .await
        .map_err(|e| {
            tracing::warn!(%address, error = %e, "authentication failed");
            AuthError::from(e)
        })?;

    let credential = Credential::new(token, address, challenge.issued_at, challenge.expires_at);
    if let Err(e) = store.save(&credential).await {
        tracing::warn!(%address, error = %e, "failed to persist credential");
    }
    tracing::info!(%address, expires_at = %credential.expires_at(), "authenticated");
    Ok(credential)
}
