//! Transcode orchestrator.
//!
//! Drives each candidate through the pipeline sequentially:
//! - **Locate**: find the source on disk and vet it (multichannel, 24-bit label)
//! - **Validate**: check the source tags once per candidate
//! - **Per format**: encode, package into a scoped workspace, upload, deliver
//!   the package to the watch directory
//!
//! Per-format failures never abort sibling formats. A candidate is recorded
//! in the ledger once its format loop has run.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::TranscodeOrchestrator;
pub use types::{
    CandidateOutcome, FormatOutcome, JobFailure, JobStage, RunReport, SkipReason,
};
