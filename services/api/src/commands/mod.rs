//! services/api/src/commands/mod.rs
//!
//! Maintenance commands run by the `manage` binary. Each command writes its
//! progress to the `out` writer it is given so it can be exercised in tests.

pub mod cleanup;
pub mod export;
pub mod seed;
pub mod train;

pub use cleanup::{cleanup_old_sessions, CleanupOptions, CleanupResult};
pub use export::{export_analytics, gather_analytics, AnalyticsReport, ExportFormat};
pub use seed::{initial_resources, setup_initial_data};
pub use train::{train_models, TrainOptions, TrainResult};

use moodigo_core::ports::PortError;

/// Errors a management command can fail with.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    Port(#[from] PortError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
