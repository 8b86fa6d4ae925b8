//! Configuration module
//!
//! Environment-driven configuration for the ingestion service: database,
//! object storage, encoder tooling, preview/sprite parameters, and the
//! transcode admission limits.

use std::env;
use std::path::PathBuf;

// Common constants
const DB_MAX_CONNECTIONS: u32 = 20;
const DB_TIMEOUT_SECONDS: u64 = 30;
const HLS_SEGMENT_SECONDS: u32 = 4;
const PREVIEW_SEGMENT_SECONDS: u32 = 2;
const PREVIEW_MAX_SECONDS: f64 = 7.0;
const SPRITE_INTERVAL_SECONDS: f64 = 5.0;
const SPRITE_GRID_COLS: u32 = 5;
const SPRITE_GRID_ROWS: u32 = 5;
const TRANSCODE_CONCURRENCY: usize = 1;
const TRANSCODE_WINDOW_SECONDS: u64 = 3600;
const TRANSCODE_WINDOW_LIMIT: usize = 3;

/// Application configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    // Database
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Object storage (S3-compatible: SeaweedFS, MinIO, AWS)
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_access_key_id: String,
    pub s3_secret_access_key: String,
    pub s3_bucket: String,
    /// Base URL the stored artifact URLs are built from, without the bucket
    /// segment (e.g. a SeaweedFS filer exposes buckets under `/buckets`).
    pub public_base_url: String,
    // Encoder tooling
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub video_codec: String,
    // Local working directories (per-video subdirs are created under these)
    pub work_dir: PathBuf,
    // Packaging parameters
    pub hls_segment_seconds: u32,
    pub preview_segment_seconds: u32,
    pub preview_max_seconds: f64,
    pub sprite_interval_seconds: f64,
    pub sprite_grid_cols: u32,
    pub sprite_grid_rows: u32,
    // Transcode admission control
    pub transcode_concurrency: usize,
    pub transcode_window_seconds: u64,
    pub transcode_window_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = Config {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| DB_TIMEOUT_SECONDS.to_string())
                .parse()
                .unwrap_or(DB_TIMEOUT_SECONDS),
            s3_endpoint: env::var("S3_ENDPOINT")
                .unwrap_or_else(|_| "http://127.0.0.1:8333".to_string()),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            s3_access_key_id: env::var("S3_ACCESS_KEY_ID").unwrap_or_else(|_| "any".to_string()),
            s3_secret_access_key: env::var("S3_SECRET_ACCESS_KEY")
                .unwrap_or_else(|_| "any".to_string()),
            s3_bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "hls-videos".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8888/buckets".to_string()),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            video_codec: env::var("VIDEO_CODEC").unwrap_or_else(|_| "h264_nvenc".to_string()),
            work_dir: PathBuf::from(env::var("WORK_DIR").unwrap_or_else(|_| "tmp".to_string())),
            hls_segment_seconds: env::var("HLS_SEGMENT_SECONDS")
                .unwrap_or_else(|_| HLS_SEGMENT_SECONDS.to_string())
                .parse()
                .unwrap_or(HLS_SEGMENT_SECONDS),
            preview_segment_seconds: env::var("PREVIEW_SEGMENT_SECONDS")
                .unwrap_or_else(|_| PREVIEW_SEGMENT_SECONDS.to_string())
                .parse()
                .unwrap_or(PREVIEW_SEGMENT_SECONDS),
            preview_max_seconds: env::var("PREVIEW_MAX_SECONDS")
                .unwrap_or_else(|_| PREVIEW_MAX_SECONDS.to_string())
                .parse()
                .unwrap_or(PREVIEW_MAX_SECONDS),
            sprite_interval_seconds: env::var("SPRITE_INTERVAL_SECONDS")
                .unwrap_or_else(|_| SPRITE_INTERVAL_SECONDS.to_string())
                .parse()
                .unwrap_or(SPRITE_INTERVAL_SECONDS),
            sprite_grid_cols: env::var("SPRITE_GRID_COLS")
                .unwrap_or_else(|_| SPRITE_GRID_COLS.to_string())
                .parse()
                .unwrap_or(SPRITE_GRID_COLS),
            sprite_grid_rows: env::var("SPRITE_GRID_ROWS")
                .unwrap_or_else(|_| SPRITE_GRID_ROWS.to_string())
                .parse()
                .unwrap_or(SPRITE_GRID_ROWS),
            transcode_concurrency: env::var("TRANSCODE_CONCURRENCY")
                .unwrap_or_else(|_| TRANSCODE_CONCURRENCY.to_string())
                .parse()
                .unwrap_or(TRANSCODE_CONCURRENCY),
            transcode_window_seconds: env::var("TRANSCODE_WINDOW_SECONDS")
                .unwrap_or_else(|_| TRANSCODE_WINDOW_SECONDS.to_string())
                .parse()
                .unwrap_or(TRANSCODE_WINDOW_SECONDS),
            transcode_window_limit: env::var("TRANSCODE_WINDOW_LIMIT")
                .unwrap_or_else(|_| TRANSCODE_WINDOW_LIMIT.to_string())
                .parse()
                .unwrap_or(TRANSCODE_WINDOW_LIMIT),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints that the env parsing alone cannot catch.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.s3_bucket.trim().is_empty() {
            anyhow::bail!("S3_BUCKET must not be empty");
        }
        if self.transcode_concurrency == 0 {
            anyhow::bail!("TRANSCODE_CONCURRENCY must be at least 1");
        }
        if self.transcode_window_limit == 0 {
            anyhow::bail!("TRANSCODE_WINDOW_LIMIT must be at least 1");
        }
        if self.transcode_window_seconds == 0 {
            anyhow::bail!("TRANSCODE_WINDOW_SECONDS must be at least 1");
        }
        if self.hls_segment_seconds == 0 || self.preview_segment_seconds == 0 {
            anyhow::bail!("HLS segment durations must be at least 1 second");
        }
        if !(self.preview_max_seconds > 0.0) {
            anyhow::bail!("PREVIEW_MAX_SECONDS must be positive");
        }
        if !(self.sprite_interval_seconds > 0.0) {
            anyhow::bail!("SPRITE_INTERVAL_SECONDS must be positive");
        }
        if self.sprite_grid_cols == 0 || self.sprite_grid_rows == 0 {
            anyhow::bail!("sprite grid dimensions must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            database_url: "postgres://localhost/vidra".to_string(),
            db_max_connections: DB_MAX_CONNECTIONS,
            db_timeout_seconds: DB_TIMEOUT_SECONDS,
            s3_endpoint: "http://127.0.0.1:8333".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_access_key_id: "any".to_string(),
            s3_secret_access_key: "any".to_string(),
            s3_bucket: "hls-videos".to_string(),
            public_base_url: "http://127.0.0.1:8888/buckets".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            video_codec: "h264_nvenc".to_string(),
            work_dir: PathBuf::from("tmp"),
            hls_segment_seconds: HLS_SEGMENT_SECONDS,
            preview_segment_seconds: PREVIEW_SEGMENT_SECONDS,
            preview_max_seconds: PREVIEW_MAX_SECONDS,
            sprite_interval_seconds: SPRITE_INTERVAL_SECONDS,
            sprite_grid_cols: SPRITE_GRID_COLS,
            sprite_grid_rows: SPRITE_GRID_ROWS,
            transcode_concurrency: TRANSCODE_CONCURRENCY,
            transcode_window_seconds: TRANSCODE_WINDOW_SECONDS,
            transcode_window_limit: TRANSCODE_WINDOW_LIMIT,
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = base_config();
        config.transcode_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_window_limit() {
        let mut config = base_config();
        config.transcode_window_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_bucket() {
        let mut config = base_config();
        config.s3_bucket = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_sprite_interval() {
        let mut config = base_config();
        config.sprite_interval_seconds = 0.0;
        assert!(config.validate().is_err());

        config.sprite_interval_seconds = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_segment_duration() {
        let mut config = base_config();
        config.preview_segment_seconds = 0;
        assert!(config.validate().is_err());
    }
}
