use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Longest stderr suffix preserved in a tool failure. Encoder stderr can run
/// to megabytes on long inputs; the tail is where the actual error lands.
const STDERR_TAIL_BYTES: usize = 4096;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Encoder exited with status {exit_code:?}: {stderr_tail}")]
    ToolFailed {
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("Probe output unparseable: {0}")]
    ProbeParse(String),

    #[error("Scheduler unavailable: {0}")]
    QueueClosed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EncodeError {
    /// Build a `ToolFailed` from a finished process, keeping a bounded
    /// stderr suffix.
    pub fn tool_failed(exit_code: Option<i32>, stderr: &[u8]) -> Self {
        let text = String::from_utf8_lossy(stderr);
        EncodeError::ToolFailed {
            exit_code,
            stderr_tail: tail(text.trim_end(), STDERR_TAIL_BYTES).to_string(),
        }
    }
}

fn tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

pub type EncodeResult<T> = Result<T, EncodeError>;

/// Pixel size of every scrub-preview frame. The front end tiles these into
/// a sheet, so the sampled frames and the persisted metadata must agree.
pub const SPRITE_FRAME_WIDTH: u32 = 160;
pub const SPRITE_FRAME_HEIGHT: u32 = 90;

/// Number of sprite frames a sampling pass emits for a source of the given
/// duration: one frame per started interval.
pub fn sprite_frame_count(duration_seconds: f64, interval_seconds: f64) -> u32 {
    (duration_seconds / interval_seconds).ceil() as u32
}

/// Packaging operations the ingestion pipeline needs from a video encoder.
///
/// Implementations treat the input as opaque media and write all output
/// below the directory they are handed. A failed operation may leave partial
/// files in that directory; callers discard the directory on failure.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Duration of the source in seconds.
    async fn probe_duration(&self, input: &Path) -> EncodeResult<f64>;

    /// Package the full adaptive-bitrate rendition set plus the master
    /// manifest under `out_dir`: `v{n}/index.m3u8` with segments per rung,
    /// `master.m3u8` at the top.
    async fn package_abr(&self, input: &Path, out_dir: &Path) -> EncodeResult<()>;

    /// Package the short muted hover-preview stream (`index.m3u8` plus
    /// segments directly under `out_dir`), truncated to `max_seconds`.
    /// Sources shorter than the cap just end early.
    async fn package_preview(
        &self,
        input: &Path,
        out_dir: &Path,
        max_seconds: f64,
    ) -> EncodeResult<()>;

    /// Sample one scrub-preview frame every `interval_seconds` into
    /// `out_dir` as `preview_001.jpg`, `preview_002.jpg`, ... and return
    /// the number of frames emitted.
    async fn package_sprites(
        &self,
        input: &Path,
        out_dir: &Path,
        interval_seconds: f64,
    ) -> EncodeResult<u32>;
}
