//! Account Sequence Module
//!
//! This module tracks the account number and sequence stamped on each
//! transaction of a run:
//! - SequenceTracker: the per-run `(account_number, sequence)` counter
//! - AccountRetriever: online lookup of the starting values

mod retriever;
mod tracker;

pub use retriever::{AccountRetriever, RpcAccountRetriever};
pub use tracker::SequenceTracker;
