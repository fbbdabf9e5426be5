//! Keyring Module
//!
//! Signing keys are only reachable through the `Keyring` trait: callers can
//! look up a key's public record and ask the keyring to sign a payload with
//! it, but never see private key material.
//!
//! - LocalKeyring: in-memory secp256k1 wallets and named multisig keys

mod local;

pub use local::LocalKeyring;

use crate::{PublicKey, error::Result};
use async_trait::async_trait;
use ethers::types::{Address, Bytes};

/// Public description of a keyring entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub name: String,
    pub address: Address,
    pub public_key: PublicKey,
}

/// Key lookup and signing capability
#[async_trait]
pub trait Keyring: Send + Sync {
    /// Resolve a key by name, or by `0x` address
    fn key(&self, reference: &str) -> Result<KeyRecord>;

    /// Sign `payload` with the key called `name`
    async fn sign(&self, name: &str, payload: &[u8]) -> Result<Bytes>;
}
