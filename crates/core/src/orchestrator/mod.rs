//! Pipeline orchestrator.
//!
//! Single loop tying the stages together: discovery finds the next low-rank
//! match, the fetcher stages its replay, the queue dispatches playback with
//! a voted perspective and reclaims artifacts afterwards.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::HeraldOrchestrator;
pub use types::{OrchestratorError, OrchestratorStatus};
