//! Vidra Storage Library
//!
//! Artifact placement and reclamation against an S3-compatible object store.
//! The `ArtifactStore` trait covers the three operations the ingestion
//! pipeline needs (ensure bucket, streaming put, recursive prefix delete)
//! plus public URL construction; backends exist for S3-compatible gateways
//! (SeaweedFS, MinIO, AWS) and the local filesystem.
//!
//! # Key layout
//!
//! All artifacts of one video live under its id: `{id}/hls/...` for the
//! adaptive-bitrate package, `{id}/preview/...` for the hover-preview stream
//! and sprite frames, `{id}/thumbnail{ext}` for the poster image. Key
//! construction is centralized in the `keys` module.

pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-local")]
pub use local::LocalArtifactStore;
#[cfg(feature = "storage-s3")]
pub use s3::{S3ArtifactStore, S3Settings};
pub use traits::{ArtifactStore, StorageError, StorageResult};
