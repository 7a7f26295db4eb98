//! Object storage provider for export artifacts.
//!
//! Wraps `object_store` backends (S3, GCS, Azure Blob Storage, local
//! filesystem) behind a single provider keyed by the configured bucket URL.
//! Writes overwrite unconditionally: the partition layout makes re-runs for
//! a date target the same paths, and last-write-wins is the intended
//! backfill semantics.

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use snafu::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::error::{
    AzureConfigSnafu, GcsConfigSnafu, InvalidUrlSnafu, IoSnafu, ObjectStoreSnafu, S3ConfigSnafu,
    StorageError,
};

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// Storage provider that abstracts over different storage backends.
pub struct StorageProvider {
    object_store: Arc<dyn ObjectStore>,
    canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for the given bucket URL.
    ///
    /// Supports `s3://bucket`, `gs://bucket`, `az://container`, and plain
    /// filesystem paths. Cloud credentials are taken from the environment;
    /// a local path is created if it does not exist.
    pub async fn for_url(url: &str) -> Result<Self, StorageError> {
        let object_store: Arc<dyn ObjectStore> = if url.starts_with("s3://") {
            Arc::new(
                AmazonS3Builder::from_env()
                    .with_url(url)
                    .build()
                    .context(S3ConfigSnafu)?,
            )
        } else if url.starts_with("gs://") {
            Arc::new(
                GoogleCloudStorageBuilder::from_env()
                    .with_url(url)
                    .build()
                    .context(GcsConfigSnafu)?,
            )
        } else if url.starts_with("az://") || url.starts_with("abfs://") {
            Arc::new(
                MicrosoftAzureBuilder::from_env()
                    .with_url(url)
                    .build()
                    .context(AzureConfigSnafu)?,
            )
        } else if url.contains("://") {
            return InvalidUrlSnafu { url }.fail();
        } else {
            tokio::fs::create_dir_all(url).await.context(IoSnafu)?;
            Arc::new(LocalFileSystem::new_with_prefix(url).context(ObjectStoreSnafu)?)
        };

        Ok(Self {
            object_store,
            canonical_url: url.to_string(),
        })
    }

    /// Get the contents of an object.
    pub async fn get(&self, path: &str) -> Result<Bytes, StorageError> {
        let path = Path::from(path);
        let bytes = self
            .object_store
            .get(&path)
            .await
            .context(ObjectStoreSnafu)?
            .bytes()
            .await
            .context(ObjectStoreSnafu)?;
        Ok(bytes)
    }

    /// Put bytes to an object path, overwriting any existing object.
    pub async fn put(&self, path: &str, bytes: Bytes) -> Result<(), StorageError> {
        let path = Path::from(path);
        self.object_store
            .put(&path, PutPayload::from(bytes))
            .await
            .context(ObjectStoreSnafu)?;
        debug!(path = %path, store = %self.canonical_url, "Stored object");
        Ok(())
    }

    /// The URL this provider was created for.
    pub fn url(&self) -> &str {
        &self.canonical_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn local_put_get_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageProvider::for_url(temp_dir.path().to_str().unwrap())
            .await
            .unwrap();

        storage
            .put("export/blocks/block_date=2021-03-01/blocks.csv", Bytes::from_static(b"a,b\n1,2\n"))
            .await
            .unwrap();

        let bytes = storage
            .get("export/blocks/block_date=2021-03-01/blocks.csv")
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn put_overwrites_existing_object() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageProvider::for_url(temp_dir.path().to_str().unwrap())
            .await
            .unwrap();

        storage.put("blocks.csv", Bytes::from_static(b"old")).await.unwrap();
        storage.put("blocks.csv", Bytes::from_static(b"new")).await.unwrap();

        let bytes = storage.get("blocks.csv").await.unwrap();
        assert_eq!(bytes.as_ref(), b"new");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageProvider::for_url(temp_dir.path().to_str().unwrap())
            .await
            .unwrap();

        let err = storage.get("export/nope.csv").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn unknown_scheme_is_rejected() {
        let err = StorageProvider::for_url("ftp://bucket").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn local_directory_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("exports/daily");
        let storage = StorageProvider::for_url(nested.to_str().unwrap()).await.unwrap();

        storage.put("probe", Bytes::from_static(b"x")).await.unwrap();
        assert!(nested.join("probe").exists());
    }
}
