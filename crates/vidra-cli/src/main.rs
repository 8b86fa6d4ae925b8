//! Vidra CLI: ingest videos and manage the catalog from the command line.
//!
//! Configuration comes from the environment (a `.env` file is honored);
//! `DATABASE_URL` must be set, everything else has defaults. See
//! `Config::from_env` in vidra-core for the full list.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use vidra_catalog::{CatalogError, PgVideoCatalog, VideoCatalog};
use vidra_core::{init_telemetry, Config};
use vidra_ingest::{IngestRequest, IngestionPipeline, PipelineSettings};
use vidra_storage::{ArtifactStore, S3ArtifactStore, S3Settings};
use vidra_transcode::{FfmpegEncoder, TranscodeScheduler};

#[derive(Parser)]
#[command(name = "vidra", about = "Vidra video ingestion CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a video: transcode, upload, and commit a catalog record
    Ingest {
        /// Path to the source video file
        video: PathBuf,
        /// Path to the thumbnail image
        thumbnail: PathBuf,
        /// Title stored with the video
        #[arg(long)]
        title: String,
        /// Description stored with the video
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Get a single video by ID
    Get {
        /// Video UUID
        id: String,
    },
    /// List videos, newest first
    List {
        /// Maximum number of items
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Offset for pagination
        #[arg(long, default_value = "0")]
        offset: i64,
    },
    /// Search title and description
    Search {
        /// Search query
        query: String,
        /// Maximum number of results
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Offset for pagination
        #[arg(long, default_value = "0")]
        offset: i64,
    },
    /// Delete a video's artifacts and its record
    Delete {
        /// Video UUID
        id: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn parse_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("Invalid video id: {id}"))
}

/// Copy an input file into the spool directory under a unique name.
///
/// The pipeline deletes its input files when a run finishes, so the caller's
/// originals are never handed over directly.
async fn spool(source: &Path, spool_dir: &Path) -> anyhow::Result<PathBuf> {
    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Input path has no file name: {}", source.display()))?;

    let target = spool_dir.join(format!("{}-{}", Uuid::new_v4(), file_name));
    tokio::fs::copy(source, &target)
        .await
        .with_context(|| format!("Failed to copy {} into the work dir", source.display()))?;
    Ok(target)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_telemetry();

    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;

    let store = Arc::new(
        S3ArtifactStore::new(S3Settings {
            endpoint: config.s3_endpoint.clone(),
            region: config.s3_region.clone(),
            access_key_id: config.s3_access_key_id.clone(),
            secret_access_key: config.s3_secret_access_key.clone(),
            bucket: config.s3_bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        })
        .await?,
    );
    store.ensure_bucket().await?;

    let pool = vidra_catalog::connect(&config).await?;
    let catalog = Arc::new(PgVideoCatalog::new(pool));

    let encoder = Arc::new(FfmpegEncoder::new(
        config.ffmpeg_path.clone(),
        config.ffprobe_path.clone(),
        config.video_codec.clone(),
        config.hls_segment_seconds,
        config.preview_segment_seconds,
    ));
    let scheduler = Arc::new(TranscodeScheduler::new(
        config.transcode_concurrency,
        config.transcode_window_limit,
        Duration::from_secs(config.transcode_window_seconds),
    ));

    let pipeline = IngestionPipeline::new(
        store,
        catalog.clone(),
        encoder,
        scheduler,
        PipelineSettings::from_config(&config),
    );

    match cli.command {
        Commands::Ingest {
            video,
            thumbnail,
            title,
            description,
        } => {
            let spool_dir = config.work_dir.join("uploads");
            tokio::fs::create_dir_all(&spool_dir)
                .await
                .with_context(|| format!("Failed to create {}", spool_dir.display()))?;

            let video_path = spool(&video, &spool_dir).await?;
            let thumbnail_path = spool(&thumbnail, &spool_dir).await?;

            let asset = pipeline
                .ingest(IngestRequest {
                    video_path,
                    thumbnail_path,
                    title,
                    description,
                })
                .await?;
            print_json(&asset)?;
        }
        Commands::Get { id } => {
            let id = parse_id(&id)?;
            let asset = catalog.get(id).await?.ok_or(CatalogError::NotFound(id))?;
            print_json(&asset)?;
        }
        Commands::List { limit, offset } => {
            let page = catalog.list(limit, offset).await?;
            print_json(&page)?;
        }
        Commands::Search {
            query,
            limit,
            offset,
        } => {
            let page = catalog.search(&query, limit, offset).await?;
            print_json(&page)?;
        }
        Commands::Delete { id } => {
            let id = parse_id(&id)?;
            let deleted = pipeline.remove(id).await?;
            if deleted {
                print_json(&serde_json::json!({
                    "success": true,
                    "message": format!("Video {} deleted", id),
                }))?;
            } else {
                print_json(&serde_json::json!({
                    "success": false,
                    "message": format!("Video {} not found", id),
                }))?;
            }
        }
    }

    Ok(())
}
