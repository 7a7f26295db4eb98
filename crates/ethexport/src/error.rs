//! Error types for the export pipeline.

use snafu::prelude::*;
use std::path::PathBuf;

// Re-export common errors
pub use ethexport_core::error::{ConfigError, StorageError, TransferError};

/// Errors surfaced by an extraction backend.
///
/// The backend is an external collaborator; its failures are opaque to the
/// pipeline and fatal for the step invocation that triggered them.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ExtractionError {
    /// The upstream endpoint rejected or failed the request.
    #[snafu(display("Provider request failed: {message}"))]
    Provider { message: String },

    /// The backend could not read or write a local file.
    #[snafu(display("Extraction IO failure on {}: {source}", path.display()))]
    ExtractionIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The backend produced output the pipeline cannot interpret.
    #[snafu(display("Malformed extraction output: {message}"))]
    Malformed { message: String },
}

/// Errors from local file transforms.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransformError {
    /// IO failure while reading or writing a transform file.
    #[snafu(display("Transform IO failure on {}: {source}", path.display()))]
    TransformIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// CSV parsing failed.
    #[snafu(display("Failed to parse CSV {}: {source}", path.display()))]
    Csv { path: PathBuf, source: csv::Error },

    /// The input CSV has no column with the requested name.
    #[snafu(display("Column '{column}' not present in {}", path.display()))]
    MissingColumn { column: String, path: PathBuf },

    /// A JSON line could not be parsed.
    #[snafu(display("Invalid JSON on line {line} of {}: {source}", path.display()))]
    Json {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    /// A JSON line is missing the projected field.
    #[snafu(display("Field '{field}' missing on line {line} of {}", path.display()))]
    MissingField {
        field: String,
        line: usize,
        path: PathBuf,
    },
}

/// Errors from one step invocation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StepError {
    /// Artifact transfer failed.
    #[snafu(display("Transfer failed: {source}"))]
    Transfer { source: TransferError },

    /// The extraction backend failed.
    #[snafu(display("Extraction failed: {source}"))]
    Extraction { source: ExtractionError },

    /// A local transform failed.
    #[snafu(display("Transform failed: {source}"))]
    Transform { source: TransformError },

    /// The staging workspace could not be created.
    #[snafu(display("Failed to create staging workspace: {source}"))]
    Workspace { source: std::io::Error },

    /// The resolved block range file could not be read back.
    #[snafu(display("Failed to read block range file: {source}"))]
    BlockRangeRead { source: std::io::Error },

    /// The step exceeded its execution timeout.
    #[snafu(display("Step timed out after {seconds}s"))]
    Timeout { seconds: u64 },

    /// The step's task panicked.
    #[snafu(display("Step panicked: {message}"))]
    Panicked { message: String },
}

impl StepError {
    /// Check if this failure means an upstream artifact was never published.
    pub fn is_missing_upstream(&self) -> bool {
        match self {
            StepError::Transfer { source } => source.is_missing_upstream(),
            _ => false,
        }
    }
}

impl From<TransferError> for StepError {
    fn from(source: TransferError) -> Self {
        StepError::Transfer { source }
    }
}

impl From<ExtractionError> for StepError {
    fn from(source: ExtractionError) -> Self {
        StepError::Extraction { source }
    }
}

impl From<TransformError> for StepError {
    fn from(source: TransformError) -> Self {
        StepError::Transform { source }
    }
}
