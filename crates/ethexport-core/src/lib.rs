//! ethexport-core: Shared infrastructure for the ethexport pipeline.
//!
//! This crate contains the components the export pipeline is built on:
//!
//! - `storage` - Object storage provider (S3, GCS, Azure, local filesystem)
//! - `partition` - Artifact kinds and date-partitioned path resolution
//! - `staging` - Scoped per-step working directories
//! - `transfer` - Artifact publish/fetch between staging and the store
//! - `config` - Environment-sourced pipeline settings
//! - `error` - Common error types
//! - `tracing` - Tracing initialization

pub mod config;
pub mod error;
pub mod partition;
pub mod staging;
pub mod storage;
pub mod tracing;
pub mod transfer;

// Re-export commonly used items
pub use config::{Settings, StepToggles};
pub use error::{ConfigError, StorageError, TransferError};
pub use partition::{ArtifactKind, object_path, partition_path};
pub use staging::StagingWorkspace;
pub use storage::{StorageProvider, StorageProviderRef};
pub use transfer::ArtifactTransfer;

pub use crate::tracing::init_tracing;
