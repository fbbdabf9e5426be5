//! Batch Signing Module
//!
//! This module signs streams of unsigned transactions:
//! - SigningOrchestrator: stamps, checks and signs one transaction at a time
//! - BatchRunner: drives a run from account resolution to the last record

pub mod orchestrator;
mod runner;


pub use orchestrator::{BatchState, SigningOrchestrator};
pub use runner::{BatchPhase, BatchReport, BatchRunner, run_batch, run_single, sign_stream};
