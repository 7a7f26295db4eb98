//! Artifact movement between staging workspaces and the object store.
//!
//! `publish` and `fetch` are symmetric: both resolve the remote location
//! from (kind, date) plus the local file's base name, so a producer and its
//! consumers agree on addresses without sharing any state. The provider is
//! injected at construction; there is no process-global client.

use snafu::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::error::{LocalFileSnafu, ObjectNotFoundSnafu, StoreSnafu, TransferError};
use crate::partition::{ArtifactKind, partition_path};
use crate::storage::StorageProviderRef;
use chrono::NaiveDate;

/// Uploads and downloads named artifact files for one storage provider.
#[derive(Debug, Clone)]
pub struct ArtifactTransfer {
    storage: StorageProviderRef,
}

impl ArtifactTransfer {
    /// Create a transfer bound to the given provider.
    pub fn new(storage: StorageProviderRef) -> Self {
        Self { storage }
    }

    /// Upload a workspace file into the artifact's partition for `date`.
    ///
    /// The remote object is `partition_path(kind, date)` plus the file's
    /// base name. Re-publishing overwrites: backfills are last-write-wins.
    pub async fn publish(
        &self,
        local: &Path,
        kind: ArtifactKind,
        date: NaiveDate,
    ) -> Result<(), TransferError> {
        let remote = remote_path(local, kind, date)?;
        let bytes = tokio::fs::read(local)
            .await
            .context(LocalFileSnafu { path: local })?;
        self.storage
            .put(&remote, bytes.into())
            .await
            .context(StoreSnafu)?;
        debug!(artifact = %kind, path = %remote, "Published artifact");
        Ok(())
    }

    /// Download the artifact stored under the local file's base name for
    /// `date` into the workspace.
    ///
    /// A missing object means the producing step has not completed for this
    /// date; that surfaces as [`TransferError::ObjectNotFound`] and must be
    /// treated as a hard failure, never skipped.
    pub async fn fetch(
        &self,
        kind: ArtifactKind,
        date: NaiveDate,
        local: &Path,
    ) -> Result<(), TransferError> {
        let remote = remote_path(local, kind, date)?;
        let bytes = match self.storage.get(&remote).await {
            Ok(bytes) => bytes,
            Err(source) if source.is_not_found() => {
                return ObjectNotFoundSnafu { path: remote }.fail();
            }
            Err(source) => return Err(source).context(StoreSnafu),
        };
        tokio::fs::write(local, &bytes)
            .await
            .context(LocalFileSnafu { path: local })?;
        debug!(artifact = %kind, path = %remote, "Fetched artifact");
        Ok(())
    }
}

/// Remote object path for a local file: partition prefix + base name.
fn remote_path(
    local: &Path,
    kind: ArtifactKind,
    date: NaiveDate,
) -> Result<String, TransferError> {
    let Some(name) = local.file_name() else {
        return Err(TransferError::LocalFile {
            path: local.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        });
    };
    Ok(format!(
        "{}{}",
        partition_path(kind, date),
        name.to_string_lossy()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::StagingWorkspace;
    use crate::storage::StorageProvider;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn transfer_for(store_root: &TempDir) -> ArtifactTransfer {
        let storage = StorageProvider::for_url(store_root.path().to_str().unwrap())
            .await
            .unwrap();
        ArtifactTransfer::new(Arc::new(storage))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, 1).unwrap()
    }

    #[tokio::test]
    async fn publish_then_fetch_roundtrip() {
        let store_root = TempDir::new().unwrap();
        let transfer = transfer_for(&store_root).await;

        let producer = StagingWorkspace::acquire().unwrap();
        let blocks = producer.file("blocks.csv");
        std::fs::write(&blocks, b"number,hash\n1,0xabc\n").unwrap();
        transfer
            .publish(&blocks, ArtifactKind::Blocks, date())
            .await
            .unwrap();

        assert!(
            store_root
                .path()
                .join("export/blocks/block_date=2021-03-01/blocks.csv")
                .exists()
        );

        let consumer = StagingWorkspace::acquire().unwrap();
        let fetched = consumer.file("blocks.csv");
        transfer
            .fetch(ArtifactKind::Blocks, date(), &fetched)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&fetched).unwrap(), b"number,hash\n1,0xabc\n");
    }

    #[tokio::test]
    async fn publish_overwrites_previous_run() {
        let store_root = TempDir::new().unwrap();
        let transfer = transfer_for(&store_root).await;
        let workspace = StagingWorkspace::acquire().unwrap();
        let tokens = workspace.file("tokens.csv");

        std::fs::write(&tokens, b"first run").unwrap();
        transfer
            .publish(&tokens, ArtifactKind::Tokens, date())
            .await
            .unwrap();

        std::fs::write(&tokens, b"backfill run").unwrap();
        transfer
            .publish(&tokens, ArtifactKind::Tokens, date())
            .await
            .unwrap();

        let stored = std::fs::read(
            store_root
                .path()
                .join("export/tokens/block_date=2021-03-01/tokens.csv"),
        )
        .unwrap();
        assert_eq!(stored, b"backfill run");
    }

    #[tokio::test]
    async fn fetch_of_unpublished_artifact_is_not_found() {
        let store_root = TempDir::new().unwrap();
        let transfer = transfer_for(&store_root).await;
        let workspace = StagingWorkspace::acquire().unwrap();

        let err = transfer
            .fetch(ArtifactKind::Logs, date(), &workspace.file("logs.json"))
            .await
            .unwrap_err();
        assert!(err.is_missing_upstream());
        assert!(!err.is_retryable());
        // Nothing was written locally.
        assert!(!workspace.file("logs.json").exists());
    }

    #[tokio::test]
    async fn publish_of_missing_local_file_fails() {
        let store_root = TempDir::new().unwrap();
        let transfer = transfer_for(&store_root).await;
        let workspace = StagingWorkspace::acquire().unwrap();

        let err = transfer
            .publish(&workspace.file("receipts.csv"), ArtifactKind::Receipts, date())
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::LocalFile { .. }));
    }

    #[tokio::test]
    async fn different_dates_never_collide() {
        let store_root = TempDir::new().unwrap();
        let transfer = transfer_for(&store_root).await;
        let workspace = StagingWorkspace::acquire().unwrap();
        let logs = workspace.file("logs.json");

        std::fs::write(&logs, b"{\"day\":1}\n").unwrap();
        transfer
            .publish(&logs, ArtifactKind::Logs, date())
            .await
            .unwrap();

        std::fs::write(&logs, b"{\"day\":2}\n").unwrap();
        let next_day = NaiveDate::from_ymd_opt(2021, 3, 2).unwrap();
        transfer
            .publish(&logs, ArtifactKind::Logs, next_day)
            .await
            .unwrap();

        let first = std::fs::read(
            store_root
                .path()
                .join("export/logs/block_date=2021-03-01/logs.json"),
        )
        .unwrap();
        assert_eq!(first, b"{\"day\":1}\n");
    }
}
