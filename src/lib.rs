//! This crate signs previously built, unsigned ledger transactions without
//! needing a live node. It streams transactions, stamps each with the
//! signing account's number and next sequence, signs them with a single key
//! or as one member of a multisig key, and writes the results as JSON.

pub mod types; // Transactions, signatures and public keys.
pub mod error; // Error taxonomy of a signing run.
pub mod config; // File configuration and per-run signing options.
pub mod decoder; // Newline-delimited transaction input.
pub mod sequence; // Account number and sequence tracking.
pub mod multisig; // Multisig membership checks.
pub mod keyring; // Key lookup and signing capability.
pub mod encoding; // JSON output and output sinks.
pub mod batch; // Signing orchestration and run driver.

// Re-export commonly used types for easier access.
pub use types::*;
pub use config::{Config, SignOptions};
pub use error::{Error, Result};
pub use batch::{BatchRunner, SigningOrchestrator};
