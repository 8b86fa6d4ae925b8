use crate::traits::{ArtifactStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem artifact store.
///
/// Keys map directly onto paths under `base_path`, so a deployment can serve
/// the tree with any static file server. Mostly useful for development and
/// tests; production deployments point at the S3 backend.
#[derive(Clone)]
pub struct LocalArtifactStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalArtifactStore {
    /// Create a new LocalArtifactStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for artifact storage (e.g., "/var/lib/vidra/artifacts")
    /// * `base_url` - Base URL the tree is served under (e.g., "http://localhost:8888/artifacts")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalArtifactStore {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Keys are produced internally, but a hostile key must still not be able
    /// to escape the base storage directory.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(key);

        if let Ok(canonical) = path.canonicalize() {
            let base_canonical = self.base_path.canonicalize().map_err(|e| {
                StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
            })?;
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn ensure_bucket(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            StorageError::BucketUnavailable(format!(
                "Failed to create storage directory {}: {}",
                self.base_path.display(),
                e
            ))
        })
    }

    async fn put_file(&self, local_path: &Path, key: &str, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        let size_bytes = fs::copy(local_path, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to copy {} to {}: {}",
                local_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        let path = self.key_to_path(prefix)?;
        let start = std::time::Instant::now();

        match fs::remove_dir_all(&path).await {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    prefix = %prefix,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage prefix delete successful"
                );
                Ok(())
            }
            // Deleting an absent prefix is a no-op.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete prefix {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}
