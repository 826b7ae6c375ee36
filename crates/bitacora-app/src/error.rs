//! Application-level error type shared across the binary.

use thiserror::Error;

use crate::config::AppConfigError;
use crate::export::ExportError;
use crate::ingest::IngestError;
use crate::services::generation::GenerationError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] AppConfigError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("invalid batch size: {0} (must be >= 1)")]
    InvalidBatchSize(usize),
}
