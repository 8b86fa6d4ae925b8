//! Storage abstraction trait
//!
//! This module defines the ArtifactStore trait that all storage backends must
//! implement.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Listing failed: {0}")]
    ListFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Bucket unavailable: {0}")]
    BucketUnavailable(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Artifact store abstraction
///
/// The ingestion pipeline talks to the object store exclusively through this
/// trait, so backends can be swapped (S3-compatible gateway in production,
/// local filesystem in development and tests).
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Check that the target bucket exists, creating it when absent.
    ///
    /// Idempotent; called once at process start, never per request.
    async fn ensure_bucket(&self) -> StorageResult<()>;

    /// Stream a local file to `key` with the given content type.
    ///
    /// Overwrite semantics: re-uploading an existing key replaces it. The
    /// file is streamed from disk, never buffered whole in memory.
    async fn put_file(&self, local_path: &Path, key: &str, content_type: &str)
        -> StorageResult<()>;

    /// Remove every object stored under `{prefix}/`, including directory
    /// markers on stores that materialize directories as objects.
    ///
    /// Idempotent on every backend: deleting an absent prefix is a no-op.
    /// The S3 backend is additionally best-effort, retrying a failed sweep
    /// under the gateway-mapped key shape and logging whatever still fails
    /// while returning Ok; the local backend propagates its errors.
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()>;

    /// Public URL a player can fetch the stored key from.
    fn public_url(&self, key: &str) -> String;
}
