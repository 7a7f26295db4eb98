//! Common error types shared across the export pipeline.
//!
//! This module defines error types for configuration, storage, and artifact
//! transfer. Step-level errors live in the pipeline crate.

use snafu::prelude::*;
use std::path::PathBuf;

// ============ Config Errors ============

/// Errors that can occur while reading settings from the environment.
///
/// Configuration errors are fatal at startup, before any graph executes.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    #[snafu(display("Required environment variable {name} is not set"))]
    MissingVariable { name: String },

    /// An environment variable holds a value that is not a valid integer.
    #[snafu(display("Environment variable {name} is not a valid integer: {source}"))]
    InvalidInteger {
        name: String,
        source: std::num::ParseIntError,
    },
}

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Unsupported storage URL scheme.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },

    /// GCS configuration error.
    #[snafu(display("GCS configuration error: {source}"))]
    GcsConfig { source: object_store::Error },

    /// Azure configuration error.
    #[snafu(display("Azure configuration error: {source}"))]
    AzureConfig { source: object_store::Error },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Transfer Errors ============

/// Errors that can occur while moving artifacts between a staging workspace
/// and the object store.
///
/// `ObjectNotFound` and `LocalFile` are fatal for the current run;
/// `Store` covers transient store faults and is safe to retry.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransferError {
    /// The remote object does not exist. The producing step has not
    /// published this artifact for the requested date.
    #[snafu(display("Object not found at {path}"))]
    ObjectNotFound { path: String },

    /// The object store failed for a reason other than a missing object.
    #[snafu(display("Store request failed: {source}"))]
    Store { source: StorageError },

    /// The local file could not be read or written.
    #[snafu(display("Local file {} unavailable: {source}", path.display()))]
    LocalFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl TransferError {
    /// Check if this failure is a transient store fault worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::Store { .. })
    }

    /// Check if this failure means the upstream artifact is missing.
    pub fn is_missing_upstream(&self) -> bool {
        matches!(self, TransferError::ObjectNotFound { .. })
    }
}
