//! Web3-Token authentication: signers, challenges, credentials, their
//! persistence, and the de-duplicating broker.

pub mod broker;
pub mod signer;
pub mod store;
pub mod token;

pub use broker::{AuthState, AuthenticationBroker};
pub use signer::{recover_address, LocalKeySigner, Signer};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use token::{Challenge, ChallengeParams, Credential, DEFAULT_STATEMENT};
