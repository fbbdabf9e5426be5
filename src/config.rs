//! Configuration Module
//!
//! This module defines the file configuration of the signer and the
//! per-run signing options.
//! File configuration is loaded from TOML and parsed using serde.

use anyhow::Context;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// # Example TOML
/// ```toml
/// [node]
/// rpc_url = "http://127.0.0.1:26657"
/// chain_id = "testing"
///
/// [[keyring.keys]]
/// name = "alice"
/// private_key = "0x..."
///
/// [[keyring.multisig]]
/// name = "team"
/// threshold = 2
/// members = ["alice", "bob", "carol"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    #[serde(default)]
    pub keyring: KeyringConfig,
}

/// Ledger node settings
///
/// # Fields
/// - `rpc_url`: JSON-RPC endpoint queried for account state when online
/// - `chain_id`: chain identifier committed to by every signature
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub rpc_url: String,
    pub chain_id: String,
}

/// Keys available to the local keyring
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyringConfig {
    #[serde(default)]
    pub keys: Vec<KeyConfig>,
    #[serde(default)]
    pub multisig: Vec<MultisigConfig>,
}

/// A named secp256k1 key
#[derive(Clone, Deserialize)]
pub struct KeyConfig {
    pub name: String,
    /// Hex-encoded private key, with or without `0x`
    pub private_key: String,
}

// keep key material out of logs
impl fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyConfig")
            .field("name", &self.name)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// A named multisig key built from keys of the keyring
#[derive(Debug, Clone, Deserialize)]
pub struct MultisigConfig {
    pub name: String,
    pub threshold: usize,
    /// Names of member keys, in slot order
    pub members: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` naming the file if it couldn't be read or the TOML is invalid
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("invalid configuration")?;
        Ok(config)
    }
}

/// Options of a single sign or sign-batch run
///
/// # Fields
/// - `from`: name or address of the signing key
/// - `multisig`: name or address of the multisig key signed on behalf of;
///   forces signature-only output
/// - `offline`: never query the node; `account_number` and `sequence` must
///   then be given unless `multisig` is set
/// - `signature_only`: emit only the new signature instead of the whole
///   transaction
/// - `overwrite`: replace an earlier signature of the same key instead of
///   appending
/// - `output_document`: write output to this file instead of stdout
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    pub from: String,
    pub multisig: Option<String>,
    pub offline: bool,
    pub signature_only: bool,
    pub overwrite: bool,
    pub account_number: Option<u64>,
    pub sequence: Option<u64>,
    pub output_document: Option<PathBuf>,
    pub chain_id: String,
}
