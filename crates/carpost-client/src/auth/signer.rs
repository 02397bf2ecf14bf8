//! Message signers.
//!
//! The broker only needs an account address and a way to sign a text
//! message; wallets, hardware devices and remote signers plug in behind
//! [`Signer`]. [`LocalKeySigner`] signs with an in-process secp256k1 key.

use async_trait::async_trait;
use carpost_core::AccountAddress;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand_core::OsRng;
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

use crate::error::SignerError;

/// Produces signatures over challenge messages for one account.
///
/// `sign_message` may suspend for as long as it takes a user to approve the
/// request. Callers bound it with a timeout; implementations need not.
#[async_trait]
pub trait Signer: Send + Sync {
    /// The account this signer signs for.
    fn address(&self) -> AccountAddress;

    /// Sign `message` as an Ethereum personal message, returning a 0x-hex
    /// 65-byte `r || s || v` signature.
    async fn sign_message(&self, message: &str) -> Result<String, SignerError>;
}

/// Keccak-256 of the EIP-191 personal-message framing of `message`.
pub fn personal_message_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Derive the account address of a public key.
pub fn address_of(key: &VerifyingKey) -> AccountAddress {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    AccountAddress::from_bytes(bytes)
}

/// Recover the signing account from a personal-message signature.
pub fn recover_address(message: &str, signature: &str) -> Result<AccountAddress, SignerError> {
    let raw = hex::decode(signature.trim_start_matches("0x"))
        .map_err(|e| SignerError::Signature(e.to_string()))?;
    if raw.len() != 65 {
        return Err(SignerError::Signature(format!("expected 65 bytes, got {}", raw.len())));
    }
    let sig = Signature::from_slice(&raw[..64]).map_err(|e| SignerError::Signature(e.to_string()))?;
    let v = raw[64];
    let recid = RecoveryId::from_byte(if v >= 27 { v - 27 } else { v })
        .ok_or_else(|| SignerError::Signature(format!("invalid recovery byte {v}")))?;
    let key = VerifyingKey::recover_from_prehash(&personal_message_hash(message), &sig, recid)
        .map_err(|e| SignerError::Signature(e.to_string()))?;
    Ok(address_of(&key))
}

/// Signs with a secp256k1 key held in memory. The key is zeroized on drop.
pub struct LocalKeySigner {
    key: SigningKey,
    address: AccountAddress,
}

impl LocalKeySigner {
    pub fn new(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    /// Parse a 32-byte hex private key, with or without `0x`.
    pub fn from_hex(hex_key: &str) -> Result<Self, SignerError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_key.trim().trim_start_matches("0x"))
                .map_err(|e| SignerError::InvalidKey(e.to_string()))?,
        );
        let key = SigningKey::from_slice(&bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self::new(key))
    }

    /// Generate a fresh random key.
    pub fn random() -> Self {
        Self::new(SigningKey::random(&mut OsRng))
    }
}

impl std::fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeySigner")
            .field("address", &self.address)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Signer for LocalKeySigner {
    fn address(&self) -> AccountAddress {
        self.address
    }

    async fn sign_message(&self, message: &str) -> Result<String, SignerError> {
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(&personal_message_hash(message))
            .map_err(|e| SignerError::Signature(e.to_string()))?;
        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&sig.to_bytes());
        out.push(recid.to_byte() + 27);
        Ok(format!("0x{}", hex::encode(out)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const ADDRESS: &str = "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23";

    #[test]
    fn derives_known_address() {
        let signer = LocalKeySigner::from_hex(KEY).unwrap();
        assert_eq!(signer.address().to_string(), ADDRESS);
        assert_eq!(signer.address().to_checksum(), "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23");
    }

    #[tokio::test]
    async fn signature_recovers_to_signer() {
        let signer = LocalKeySigner::random();
        let sig = signer.sign_message("Web3 Token Version: 2").await.unwrap();
        assert_eq!(sig.len(), 2 + 130);
        let v = u8::from_str_radix(&sig[130..], 16).unwrap();
        assert!(v == 27 || v == 28);
        assert_eq!(recover_address("Web3 Token Version: 2", &sig).unwrap(), signer.address());
        assert_ne!(recover_address("another message", &sig).ok(), Some(signer.address()));
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(matches!(LocalKeySigner::from_hex("0x1234"), Err(SignerError::InvalidKey(_))));
        assert!(matches!(LocalKeySigner::from_hex("zz"), Err(SignerError::InvalidKey(_))));
    }

    #[test]
    fn debug_redacts_key() {
        let debug = format!("{:?}", LocalKeySigner::from_hex(KEY).unwrap());
        assert!(!debug.contains("4c0883a6"));
    }
}
