//! Test helpers: deterministic encoder, in-memory catalog, and store
//! wrappers for pipeline integration tests.
//!
//! Run from workspace root: `cargo test -p vidra-ingest`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;
use vidra_catalog::{CatalogError, CatalogResult, VideoCatalog};
use vidra_core::{NewVideoAsset, VideoAsset, VideoPage};
use vidra_ingest::{IngestRequest, IngestionPipeline, PipelineSettings};
use vidra_storage::{ArtifactStore, LocalArtifactStore, StorageError, StorageResult};
use vidra_transcode::{
    master_playlist, sprite_frame_count, EncodeError, EncodeResult, Encoder, TranscodeScheduler,
    LADDER,
};

/// Encoder double that writes the same file layout ffmpeg would, without
/// spawning anything. Duration is fixed at construction; each packaging
/// operation can be told to fail the way a crashed tool does.
pub struct FixtureEncoder {
    duration_seconds: f64,
    fail_abr: bool,
    fail_preview: bool,
    fail_sprites: bool,
    sprite_scratch: bool,
    abr_delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FixtureEncoder {
    pub fn new(duration_seconds: f64) -> Self {
        Self {
            duration_seconds,
            fail_abr: false,
            fail_preview: false,
            fail_sprites: false,
            sprite_scratch: false,
            abr_delay: Duration::ZERO,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn failing_abr(mut self) -> Self {
        self.fail_abr = true;
        self
    }

    pub fn failing_preview(mut self) -> Self {
        self.fail_preview = true;
        self
    }

    pub fn failing_sprites(mut self) -> Self {
        self.fail_sprites = true;
        self
    }

    /// Leave an intermediate file next to the sprite frames, the way a
    /// sampling pass with a palette step would.
    pub fn with_sprite_scratch(mut self) -> Self {
        self.sprite_scratch = true;
        self
    }

    /// Make `package_abr` take a while, so overlap would be observable.
    pub fn with_abr_delay(mut self, delay: Duration) -> Self {
        self.abr_delay = delay;
        self
    }

    /// Highest number of `package_abr` calls ever running at once.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

fn tool_crash() -> EncodeError {
    EncodeError::ToolFailed {
        exit_code: Some(1),
        stderr_tail: "Conversion failed!".to_string(),
    }
}

#[async_trait]
impl Encoder for FixtureEncoder {
    async fn probe_duration(&self, _input: &Path) -> EncodeResult<f64> {
        Ok(self.duration_seconds)
    }

    async fn package_abr(&self, _input: &Path, out_dir: &Path) -> EncodeResult<()> {
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(self.abr_delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_abr {
            return Err(tool_crash());
        }

        for (index, _rung) in LADDER.iter().enumerate() {
            let variant_dir = out_dir.join(format!("v{index}"));
            tokio::fs::create_dir_all(&variant_dir).await?;
            tokio::fs::write(variant_dir.join("index.m3u8"), b"#EXTM3U\n").await?;
            tokio::fs::write(variant_dir.join("segment_000.ts"), b"segment-bytes").await?;
        }
        tokio::fs::write(out_dir.join("master.m3u8"), master_playlist(&LADDER)).await?;
        Ok(())
    }

    async fn package_preview(
        &self,
        _input: &Path,
        out_dir: &Path,
        _max_seconds: f64,
    ) -> EncodeResult<()> {
        if self.fail_preview {
            return Err(tool_crash());
        }

        tokio::fs::create_dir_all(out_dir).await?;
        tokio::fs::write(out_dir.join("index.m3u8"), b"#EXTM3U\n").await?;
        tokio::fs::write(out_dir.join("segment_000.ts"), b"segment-bytes").await?;
        Ok(())
    }

    async fn package_sprites(
        &self,
        _input: &Path,
        out_dir: &Path,
        interval_seconds: f64,
    ) -> EncodeResult<u32> {
        if self.fail_sprites {
            return Err(tool_crash());
        }

        tokio::fs::create_dir_all(out_dir).await?;
        let frames = sprite_frame_count(self.duration_seconds, interval_seconds);
        for n in 1..=frames {
            tokio::fs::write(out_dir.join(format!("preview_{n:03}.jpg")), b"jpeg-bytes").await?;
        }
        if self.sprite_scratch {
            tokio::fs::write(out_dir.join("palette.png"), b"png-bytes").await?;
        }
        Ok(frames)
    }
}

/// HashMap-backed catalog; same contract as the Postgres one.
#[derive(Default)]
pub struct MemoryCatalog {
    rows: Mutex<HashMap<Uuid, VideoAsset>>,
    fail_create: bool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog whose `create` always fails, as a dropped connection would.
    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.rows.lock().unwrap().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn page(&self, mut matches: Vec<VideoAsset>, limit: i64, offset: i64) -> VideoPage {
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matches.len() as i64;
        let items = matches
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        VideoPage::new(items, total, limit)
    }
}

#[async_trait]
impl VideoCatalog for MemoryCatalog {
    async fn create(&self, asset: NewVideoAsset) -> CatalogResult<VideoAsset> {
        if self.fail_create {
            return Err(CatalogError::Database(sqlx::Error::PoolTimedOut));
        }

        let now = Utc::now();
        let stored = VideoAsset {
            id: asset.id,
            title: asset.title,
            description: asset.description,
            video_manifest_url: asset.video_manifest_url,
            preview_manifest_url: asset.preview_manifest_url,
            thumbnail_url: asset.thumbnail_url,
            preview_meta: asset.preview_meta,
            created_at: now,
            updated_at: now,
        };
        self.rows
            .lock()
            .unwrap()
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> CatalogResult<Option<VideoAsset>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> CatalogResult<VideoPage> {
        let all = self.rows.lock().unwrap().values().cloned().collect();
        Ok(self.page(all, limit, offset))
    }

    async fn search(&self, query: &str, limit: i64, offset: i64) -> CatalogResult<VideoPage> {
        let needle = query.to_lowercase();
        let matches = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|asset| {
                asset.title.to_lowercase().contains(&needle)
                    || asset.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        Ok(self.page(matches, limit, offset))
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }
}

/// Store wrapper that fails any put whose key contains a marker substring.
pub struct FlakyStore {
    inner: LocalArtifactStore,
    fail_keys_containing: String,
}

#[async_trait]
impl ArtifactStore for FlakyStore {
    async fn ensure_bucket(&self) -> StorageResult<()> {
        self.inner.ensure_bucket().await
    }

    async fn put_file(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        if key.contains(&self.fail_keys_containing) {
            return Err(StorageError::UploadFailed(format!(
                "injected failure for {key}"
            )));
        }
        self.inner.put_file(local_path, key, content_type).await
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        self.inner.delete_prefix(prefix).await
    }

    fn public_url(&self, key: &str) -> String {
        self.inner.public_url(key)
    }
}

/// Store wrapper that records every `(key, content_type)` it was asked to
/// put, then delegates.
pub struct RecordingStore {
    inner: LocalArtifactStore,
    puts: Mutex<Vec<(String, String)>>,
}

impl RecordingStore {
    pub fn puts(&self) -> Vec<(String, String)> {
        self.puts.lock().unwrap().clone()
    }

    pub fn content_type_of(&self, key_suffix: &str) -> Option<String> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .find(|(key, _)| key.ends_with(key_suffix))
            .map(|(_, content_type)| content_type.clone())
    }
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    async fn ensure_bucket(&self) -> StorageResult<()> {
        self.inner.ensure_bucket().await
    }

    async fn put_file(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        self.puts
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string()));
        self.inner.put_file(local_path, key, content_type).await
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        self.inner.delete_prefix(prefix).await
    }

    fn public_url(&self, key: &str) -> String {
        self.inner.public_url(key)
    }
}

/// Base the local test store builds public URLs from.
pub const STORE_BASE_URL: &str = "http://store.test";

/// One assembled pipeline with its collaborators and temp dirs kept alive.
pub struct TestPipeline {
    pub pipeline: Arc<IngestionPipeline>,
    pub catalog: Arc<MemoryCatalog>,
    pub encoder: Arc<FixtureEncoder>,
    pub store_root: PathBuf,
    pub work_dir: PathBuf,
    _store_dir: TempDir,
    _work_dir: TempDir,
}

impl TestPipeline {
    /// Write a throwaway source video and thumbnail, returning the request
    /// that hands them to the pipeline.
    pub async fn new_request(&self, title: &str) -> IngestRequest {
        let video_path = self.work_dir.join(format!("upload-{}.mp4", Uuid::new_v4()));
        let thumbnail_path = self.work_dir.join(format!("upload-{}.jpg", Uuid::new_v4()));
        tokio::fs::write(&video_path, b"not really mpeg-4")
            .await
            .unwrap();
        tokio::fs::write(&thumbnail_path, b"not really a jpeg")
            .await
            .unwrap();

        IngestRequest {
            video_path,
            thumbnail_path,
            title: title.to_string(),
            description: format!("{title} description"),
        }
    }

    /// Local path of the object stored under `key`.
    pub fn stored(&self, key: &str) -> PathBuf {
        self.store_root.join(key)
    }
}

/// Pipeline over a plain local store and a fresh in-memory catalog.
pub async fn setup(encoder: FixtureEncoder) -> TestPipeline {
    let store_dir = tempfile::tempdir().unwrap();
    let store = LocalArtifactStore::new(store_dir.path(), STORE_BASE_URL.to_string())
        .await
        .unwrap();
    assemble(encoder, MemoryCatalog::new(), Arc::new(store), store_dir).await
}

/// Pipeline whose store rejects keys containing `marker`.
pub async fn setup_flaky(encoder: FixtureEncoder, marker: &str) -> TestPipeline {
    let store_dir = tempfile::tempdir().unwrap();
    let inner = LocalArtifactStore::new(store_dir.path(), STORE_BASE_URL.to_string())
        .await
        .unwrap();
    let store = FlakyStore {
        inner,
        fail_keys_containing: marker.to_string(),
    };
    assemble(encoder, MemoryCatalog::new(), Arc::new(store), store_dir).await
}

/// Pipeline over a store that records every put; the handle is returned
/// alongside so tests can inspect the recorded content types.
pub async fn setup_recording(encoder: FixtureEncoder) -> (TestPipeline, Arc<RecordingStore>) {
    let store_dir = tempfile::tempdir().unwrap();
    let inner = LocalArtifactStore::new(store_dir.path(), STORE_BASE_URL.to_string())
        .await
        .unwrap();
    let store = Arc::new(RecordingStore {
        inner,
        puts: Mutex::new(Vec::new()),
    });
    let harness = assemble(encoder, MemoryCatalog::new(), store.clone(), store_dir).await;
    (harness, store)
}

/// Pipeline with a caller-provided catalog double.
pub async fn setup_with_catalog(encoder: FixtureEncoder, catalog: MemoryCatalog) -> TestPipeline {
    let store_dir = tempfile::tempdir().unwrap();
    let store = LocalArtifactStore::new(store_dir.path(), STORE_BASE_URL.to_string())
        .await
        .unwrap();
    assemble(encoder, catalog, Arc::new(store), store_dir).await
}

async fn assemble(
    encoder: FixtureEncoder,
    catalog: MemoryCatalog,
    store: Arc<dyn ArtifactStore>,
    store_dir: TempDir,
) -> TestPipeline {
    let work_dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(catalog);
    let encoder = Arc::new(encoder);
    let scheduler = Arc::new(TranscodeScheduler::new(1, 100, Duration::from_secs(60)));

    let settings = PipelineSettings {
        work_dir: work_dir.path().to_path_buf(),
        preview_max_seconds: 7.0,
        sprite_interval_seconds: 5.0,
        sprite_grid_cols: 5,
        sprite_grid_rows: 5,
    };

    let pipeline = Arc::new(IngestionPipeline::new(
        store,
        catalog.clone(),
        encoder.clone(),
        scheduler,
        settings,
    ));

    TestPipeline {
        pipeline,
        catalog,
        encoder,
        store_root: store_dir.path().to_path_buf(),
        work_dir: work_dir.path().to_path_buf(),
        _store_dir: store_dir,
        _work_dir: work_dir,
    }
}

/// Every regular file left under `root`, recursively.
pub fn remaining_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }

    files
}
