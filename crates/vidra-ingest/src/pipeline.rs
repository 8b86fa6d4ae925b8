//! The ingestion pipeline: source media in, committed catalog record out.
//!
//! One run owns one video id, three working directories under the work dir,
//! and the `{id}/` prefix in the object store. Stages run strictly in order;
//! the catalog record is written last, after every artifact it references is
//! already stored. Local workspace cleanup runs whatever the outcome.

use crate::cleanup;
use crate::error::{IngestError, IngestResult};
use crate::stage::IngestStage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;
use vidra_catalog::VideoCatalog;
use vidra_core::{Config, NewVideoAsset, PreviewMeta, VideoAsset};
use vidra_storage::{keys, ArtifactStore, StorageError};
use vidra_transcode::{
    Encoder, TranscodeJob, TranscodeScheduler, SPRITE_FRAME_HEIGHT, SPRITE_FRAME_WIDTH,
};

/// Packaging parameters the pipeline reads per run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Root for the per-video working directories.
    pub work_dir: PathBuf,
    pub preview_max_seconds: f64,
    pub sprite_interval_seconds: f64,
    pub sprite_grid_cols: u32,
    pub sprite_grid_rows: u32,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            work_dir: config.work_dir.clone(),
            preview_max_seconds: config.preview_max_seconds,
            sprite_interval_seconds: config.sprite_interval_seconds,
            sprite_grid_cols: config.sprite_grid_cols,
            sprite_grid_rows: config.sprite_grid_rows,
        }
    }
}

/// A request to ingest one video.
///
/// The pipeline takes ownership of both files: they are deleted when the
/// run finishes, whatever the outcome. Callers that need their originals
/// afterwards hand the pipeline a copy.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub video_path: PathBuf,
    pub thumbnail_path: PathBuf,
    pub title: String,
    pub description: String,
}

/// Drives one video from uploaded source files to a committed catalog
/// record, through the stages of [`IngestStage`].
pub struct IngestionPipeline {
    store: Arc<dyn ArtifactStore>,
    catalog: Arc<dyn VideoCatalog>,
    encoder: Arc<dyn Encoder>,
    scheduler: Arc<TranscodeScheduler>,
    settings: PipelineSettings,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        catalog: Arc<dyn VideoCatalog>,
        encoder: Arc<dyn Encoder>,
        scheduler: Arc<TranscodeScheduler>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            encoder,
            scheduler,
            settings,
        }
    }

    /// Ingest one video end to end.
    ///
    /// Returns the committed record. On any stage failure the remaining
    /// stages are skipped and the typed error is returned; either way the
    /// source files and working directories are removed before returning.
    #[tracing::instrument(skip(self, request), fields(title = %request.title))]
    pub async fn ingest(&self, request: IngestRequest) -> IngestResult<VideoAsset> {
        let video_id = Uuid::new_v4();
        let started = Instant::now();
        let mut stage = IngestStage::Received;

        tracing::info!(
            video_id = %video_id,
            input = %request.video_path.display(),
            stage = %stage,
            "Starting video ingestion"
        );

        let hls_dir = self.stage_dir("hls", &video_id);
        let preview_dir = self.stage_dir("preview_hls", &video_id);
        let sprite_dir = self.stage_dir("preview_sprites", &video_id);

        let result = self
            .run_stages(
                video_id,
                &request,
                &hls_dir,
                &preview_dir,
                &sprite_dir,
                &mut stage,
            )
            .await;

        cleanup::remove_workspace(
            video_id,
            &[&request.video_path, &request.thumbnail_path],
            &[&hls_dir, &preview_dir, &sprite_dir],
        )
        .await;

        match &result {
            Ok(_) => {
                tracing::info!(
                    video_id = %video_id,
                    duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "Video ingestion completed successfully"
                );
            }
            Err(e) => {
                tracing::error!(
                    video_id = %video_id,
                    error = %e,
                    failed_stage = %stage,
                    stage = %IngestStage::Failed,
                    "Video ingestion failed"
                );
            }
        }

        result
    }

    async fn run_stages(
        &self,
        video_id: Uuid,
        request: &IngestRequest,
        hls_dir: &Path,
        preview_dir: &Path,
        sprite_dir: &Path,
        stage: &mut IngestStage,
    ) -> IngestResult<VideoAsset> {
        check_input(&request.video_path, "video").await?;
        check_input(&request.thumbnail_path, "thumbnail").await?;

        // The only admission-controlled invocation: the full rendition set
        // is the expensive encoder job. Preview and sprite passes are light
        // enough to run outside the window budget.
        advance(video_id, stage, IngestStage::Transcoding);
        let job = TranscodeJob::new(video_id, request.video_path.clone(), hls_dir.to_path_buf());
        self.scheduler
            .submit(job, || {
                self.encoder.package_abr(&request.video_path, hls_dir)
            })
            .await?;

        advance(video_id, stage, IngestStage::UploadingPreview);
        self.encoder
            .package_preview(
                &request.video_path,
                preview_dir,
                self.settings.preview_max_seconds,
            )
            .await?;
        self.upload_tree(video_id, keys::PREVIEW_NAMESPACE, preview_dir)
            .await?;

        advance(video_id, stage, IngestStage::UploadingRenditions);
        self.upload_tree(video_id, keys::HLS_NAMESPACE, hls_dir)
            .await?;

        advance(video_id, stage, IngestStage::UploadingSprites);
        let sprite_count = self
            .encoder
            .package_sprites(
                &request.video_path,
                sprite_dir,
                self.settings.sprite_interval_seconds,
            )
            .await?;
        self.upload_sprite_frames(video_id, sprite_dir).await?;

        advance(video_id, stage, IngestStage::UploadingThumbnail);
        let extension = request.thumbnail_path.extension().and_then(|e| e.to_str());
        let thumbnail_key = keys::thumbnail_key(&video_id, extension);
        self.store
            .put_file(
                &request.thumbnail_path,
                &thumbnail_key,
                keys::content_type_for_path(&request.thumbnail_path),
            )
            .await?;

        // The record is the last write. Everything it references is already
        // stored, so a crash before this point leaves no record behind.
        let asset = self
            .catalog
            .create(NewVideoAsset {
                id: video_id,
                title: request.title.clone(),
                description: request.description.clone(),
                video_manifest_url: self
                    .store
                    .public_url(&keys::master_manifest_key(&video_id)),
                preview_manifest_url: self
                    .store
                    .public_url(&keys::preview_manifest_key(&video_id)),
                thumbnail_url: self.store.public_url(&thumbnail_key),
                preview_meta: PreviewMeta {
                    sprite_base_url: self.store.public_url(&keys::sprite_base_key(&video_id)),
                    frame_interval: self.settings.sprite_interval_seconds,
                    sprite_count,
                    cols: self.settings.sprite_grid_cols,
                    rows: self.settings.sprite_grid_rows,
                    frame_width: SPRITE_FRAME_WIDTH,
                    frame_height: SPRITE_FRAME_HEIGHT,
                },
            })
            .await?;
        advance(video_id, stage, IngestStage::Committed);

        Ok(asset)
    }

    /// Remove a video: the stored artifact tree first, then the catalog
    /// record. The two steps are not transactional. Returns `false` when no
    /// record existed; the prefix delete is idempotent either way.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, video_id: Uuid) -> IngestResult<bool> {
        self.store.delete_prefix(&video_id.to_string()).await?;
        let deleted = self.catalog.delete(video_id).await?;

        tracing::info!(
            video_id = %video_id,
            deleted = deleted,
            "Video removal finished"
        );
        Ok(deleted)
    }

    /// Upload every non-hidden file below `root` to
    /// `{video_id}/{namespace}/{relative_path}`, in sorted order, with the
    /// extension-inferred content type. Any single failed put fails the
    /// whole tree.
    async fn upload_tree(&self, video_id: Uuid, namespace: &str, root: &Path) -> IngestResult<()> {
        let files = collect_files(root).await.map_err(StorageError::from)?;

        for relative in &files {
            let local = root.join(relative);
            let key = keys::artifact_key(&video_id, namespace, relative);
            let content_type = keys::content_type_for_path(&local);
            self.store.put_file(&local, &key, content_type).await?;
        }

        tracing::info!(
            video_id = %video_id,
            namespace = namespace,
            files = files.len(),
            "Uploaded artifact tree"
        );
        Ok(())
    }

    /// Upload the `preview_*.jpg` sprite frames sitting in `dir`, flat under
    /// `{video_id}/preview/`, in sorted order. Anything else the sampling
    /// pass left in the directory stays local.
    async fn upload_sprite_frames(&self, video_id: Uuid, dir: &Path) -> IngestResult<()> {
        let mut frames = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await.map_err(StorageError::from)?;
        while let Some(entry) = entries.next_entry().await.map_err(StorageError::from)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with("preview_") || !name.ends_with(".jpg") {
                continue;
            }
            if entry
                .file_type()
                .await
                .map_err(StorageError::from)?
                .is_file()
            {
                frames.push(name);
            }
        }
        frames.sort();

        for name in &frames {
            let local = dir.join(name);
            let key = keys::artifact_key(&video_id, keys::PREVIEW_NAMESPACE, name);
            self.store
                .put_file(&local, &key, keys::content_type_for_path(&local))
                .await?;
        }

        tracing::info!(
            video_id = %video_id,
            frames = frames.len(),
            "Uploaded sprite frames"
        );
        Ok(())
    }

    fn stage_dir(&self, kind: &str, video_id: &Uuid) -> PathBuf {
        self.settings.work_dir.join(kind).join(video_id.to_string())
    }
}

fn advance(video_id: Uuid, stage: &mut IngestStage, next: IngestStage) {
    tracing::info!(
        video_id = %video_id,
        from = %stage,
        stage = %next,
        "Ingestion stage"
    );
    *stage = next;
}

async fn check_input(path: &Path, role: &str) -> IngestResult<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(IngestError::Input(format!(
            "{} path is not a file: {}",
            role,
            path.display()
        ))),
        Err(_) => Err(IngestError::Input(format!(
            "{} file not found: {}",
            role,
            path.display()
        ))),
    }
}

/// Walk `root` and return the relative paths of every regular file, with
/// `/` separators, sorted. Dot-files and dot-directories are skipped, so
/// editor droppings cannot leak into the store.
async fn collect_files(root: &Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
                continue;
            }

            let relative = path.strip_prefix(root).map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::InvalidData, "path escaped walk root")
            })?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            files.push(relative);
        }
    }

    files.sort();
    Ok(files)
}
