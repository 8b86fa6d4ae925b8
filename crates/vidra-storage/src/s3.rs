use crate::traits::{ArtifactStore, StorageError, StorageResult};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use std::collections::BTreeSet;
use std::path::Path;

/// S3 DeleteObjects accepts at most 1000 keys per request.
const MAX_DELETE_BATCH: usize = 1000;

/// Connection settings for an S3-compatible endpoint.
///
/// The store always talks path-style to a custom endpoint, which is what
/// SeaweedFS and MinIO gateways expect.
#[derive(Clone, Debug)]
pub struct S3Settings {
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    /// Base URL artifact keys are appended to when building public URLs,
    /// e.g. "http://localhost:8888/buckets".
    pub public_base_url: String,
}

/// S3 artifact store implementation
#[derive(Clone)]
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3ArtifactStore {
    /// Create a new S3ArtifactStore instance
    ///
    /// Builds a client with static credentials and path-style addressing
    /// against the configured endpoint. No requests are made until the first
    /// operation; call [`ArtifactStore::ensure_bucket`] at startup to fail
    /// fast on an unreachable endpoint.
    pub async fn new(settings: S3Settings) -> StorageResult<Self> {
        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(settings.region.clone()));

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let credentials = Credentials::new(
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
            None,
            None,
            "static",
        );

        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .credentials_provider(credentials)
            .retry_config(retry_config)
            .load()
            .await;

        // Path-style addressing is required for S3-compatible gateways.
        let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .endpoint_url(settings.endpoint.clone())
            .force_path_style(true)
            .build();

        Ok(S3ArtifactStore {
            client: Client::from_conf(s3_config),
            bucket: settings.bucket,
            public_base_url: settings.public_base_url,
        })
    }

    /// List every object key under `{prefix}/` and delete them in batches.
    ///
    /// Returns the number of objects deleted; an empty listing deletes
    /// nothing and returns zero.
    async fn delete_tree(&self, prefix: &str) -> StorageResult<usize> {
        let scoped = format!("{}/", prefix.trim_end_matches('/'));

        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&scoped);
            if let Some(t) = token.as_deref() {
                request = request.continuation_token(t);
            }
            let response = request
                .send()
                .await
                .map_err(|e| StorageError::ListFailed(e.to_string()))?;

            if let Some(contents) = response.contents {
                for object in contents {
                    if let Some(key) = object.key {
                        keys.push(key);
                    }
                }
            }

            if response.is_truncated.unwrap_or(false) {
                token = response.next_continuation_token;
                if token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }

        for chunk in keys.chunks(MAX_DELETE_BATCH) {
            let objects = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

            self.client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;
        }

        // Some gateways materialize directories as zero-byte marker objects
        // that a keyed batch delete leaves behind. Sweep them children-first;
        // a backend without markers just ignores the keys.
        for marker in marker_keys(prefix, &keys) {
            if let Err(e) = self
                .client
                .delete_object()
                .bucket(&self.bucket)
                .key(&marker)
                .send()
                .await
            {
                tracing::debug!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %marker,
                    "Directory marker cleanup skipped"
                );
            }
        }

        Ok(keys.len())
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn ensure_bucket(&self) -> StorageResult<()> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            tracing::debug!(bucket = %self.bucket, "Bucket already provisioned");
            return Ok(());
        }

        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket, "Bucket created");
                Ok(())
            }
            Err(e) => {
                // A concurrent creator winning the race is not a failure.
                let already_exists = matches!(
                    &e,
                    SdkError::ServiceError(service_err)
                        if service_err.err().is_bucket_already_exists()
                            || service_err.err().is_bucket_already_owned_by_you()
                );
                if already_exists {
                    Ok(())
                } else {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        "Bucket provisioning failed"
                    );
                    Err(StorageError::BucketUnavailable(e.to_string()))
                }
            }
        }
    }

    async fn put_file(&self, local_path: &Path, key: &str, content_type: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let size_bytes = tokio::fs::metadata(local_path).await?.len();

        // ByteStream reads the file in chunks while the request body is sent.
        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to open {}: {}",
                local_path.display(),
                e
            ))
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size_bytes,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();

        match self.delete_tree(prefix).await {
            Ok(deleted) => {
                tracing::info!(
                    bucket = %self.bucket,
                    prefix = %prefix,
                    objects_deleted = deleted,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 prefix delete successful"
                );
                Ok(())
            }
            Err(first) => {
                // Gateways that mount buckets under a path segment key the
                // same tree as "buckets/{bucket}/{prefix}". Try that layout
                // before giving up.
                let alternate = format!("buckets/{}/{}", self.bucket, prefix);
                tracing::warn!(
                    error = %first,
                    bucket = %self.bucket,
                    prefix = %prefix,
                    alternate = %alternate,
                    "S3 prefix delete failed, retrying alternate layout"
                );

                match self.delete_tree(&alternate).await {
                    Ok(deleted) => {
                        tracing::info!(
                            bucket = %self.bucket,
                            prefix = %alternate,
                            objects_deleted = deleted,
                            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                            "S3 prefix delete successful"
                        );
                        Ok(())
                    }
                    Err(second) => {
                        // Reclaim is best effort; the caller proceeds either way.
                        tracing::error!(
                            error = %second,
                            bucket = %self.bucket,
                            prefix = %prefix,
                            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                            "S3 prefix delete failed on both layouts"
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket,
            key
        )
    }
}

/// Directory-marker keys implied by a set of object keys, deepest first.
///
/// For each object key, every parent directory between the object and the
/// deletion root (inclusive) yields one `{dir}/` marker key. Children sort
/// before their parents so sweeping in order never deletes a non-empty
/// marker.
fn marker_keys(prefix: &str, object_keys: &[String]) -> Vec<String> {
    let root = format!("{}/", prefix.trim_end_matches('/'));

    let mut markers = BTreeSet::new();
    markers.insert(root.clone());

    for key in object_keys {
        let mut current = key.as_str();
        while let Some(idx) = current.rfind('/') {
            current = &current[..idx];
            let marker = format!("{}/", current);
            if !marker.starts_with(&root) {
                break;
            }
            // Parents of an already-recorded directory are recorded too.
            if !markers.insert(marker) {
                break;
            }
        }
    }

    let mut sorted: Vec<String> = markers.into_iter().collect();
    sorted.sort_by_key(|marker| std::cmp::Reverse(marker.matches('/').count()));
    sorted
}

#[cfg(all(test, feature = "storage-s3"))]
mod tests {
    use super::*;

    fn keys(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn marker_keys_cover_every_parent_dir() {
        let markers = marker_keys(
            "vid",
            &keys(&[
                "vid/hls/master.m3u8",
                "vid/hls/v0/index.m3u8",
                "vid/hls/v0/segment_000.ts",
                "vid/preview/index.m3u8",
            ]),
        );

        assert_eq!(
            markers,
            vec![
                "vid/hls/v0/".to_string(),
                "vid/hls/".to_string(),
                "vid/preview/".to_string(),
                "vid/".to_string(),
            ]
        );
    }

    #[test]
    fn marker_keys_deepest_first() {
        let markers = marker_keys("vid", &keys(&["vid/a/b/c/d.ts"]));

        assert_eq!(
            markers,
            vec![
                "vid/a/b/c/".to_string(),
                "vid/a/b/".to_string(),
                "vid/a/".to_string(),
                "vid/".to_string(),
            ]
        );
    }

    #[test]
    fn marker_keys_empty_listing_yields_only_root() {
        assert_eq!(marker_keys("vid", &[]), vec!["vid/".to_string()]);
        assert_eq!(marker_keys("vid/", &[]), vec!["vid/".to_string()]);
    }

    #[tokio::test]
    async fn public_url_is_path_style() {
        let store = S3ArtifactStore::new(S3Settings {
            endpoint: "http://127.0.0.1:8333".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: "any".to_string(),
            secret_access_key: "any".to_string(),
            bucket: "hls-videos".to_string(),
            public_base_url: "http://127.0.0.1:8888/buckets/".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(
            store.public_url("vid/hls/master.m3u8"),
            "http://127.0.0.1:8888/buckets/hls-videos/vid/hls/master.m3u8"
        );
    }
}
