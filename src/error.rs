use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::infrastructure::{ApiError, StorageError};
use crate::telemetry::TelemetryError;

/// Failures that end the process. Everything inside the wizard itself is
/// reported on screen instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
