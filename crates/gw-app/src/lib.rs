//! Shared application service layer for gwflux.
//!
//! Centralizes the post-processing pipeline used by the CLI: optional
//! solver run, budget differencing, flux extraction, gaged-reach
//! aggregation, upstream roll-up and the run manifest.

pub mod command;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;

// Re-export key types for convenience
pub use command::{
    CommandOutput, CommandRunner, CommandSpec, DIAGNOSTIC_KEYWORDS, SystemCommandRunner,
    check_command_output,
};
pub use config::{BudgetConfig, PipelineConfig, RollupConfig, Thresholds, WithdrawalSource};
pub use error::{AppError, AppResult};
pub use pipeline::{PipelineResponse, TOOL_VERSION, run_pipeline};
pub use progress::{PipelineProgressEvent, PipelineStage};
