//! FfmpegEncoder - packaging via external ffmpeg/ffprobe processes.

use crate::encoder::{
    EncodeError, EncodeResult, Encoder, SPRITE_FRAME_HEIGHT, SPRITE_FRAME_WIDTH,
};
use crate::ladder::{self, VariantSpec, AUDIO_KBPS, AUDIO_SAMPLE_RATE, LADDER};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Hover-preview stream parameters, fixed to match the player.
const PREVIEW_SCALE: &str = "426:240";
const PREVIEW_VIDEO_KBPS: u32 = 300;

/// Encoder backed by ffmpeg and ffprobe binaries.
///
/// Arguments are always passed as a vector, never through a shell, so paths
/// with spaces or metacharacters cannot change the command.
pub struct FfmpegEncoder {
    ffmpeg_path: String,
    ffprobe_path: String,
    video_codec: String,
    hls_segment_seconds: u32,
    preview_segment_seconds: u32,
}

impl FfmpegEncoder {
    pub fn new(
        ffmpeg_path: String,
        ffprobe_path: String,
        video_codec: String,
        hls_segment_seconds: u32,
        preview_segment_seconds: u32,
    ) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            video_codec,
            hls_segment_seconds,
            preview_segment_seconds,
        }
    }

    async fn run_tool(&self, program: &str, args: &[String]) -> EncodeResult<Vec<u8>> {
        let output = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            tracing::error!(
                program = %program,
                exit_code = ?output.status.code(),
                "Encoder invocation failed"
            );
            return Err(EncodeError::tool_failed(
                output.status.code(),
                &output.stderr,
            ));
        }

        Ok(output.stdout)
    }

    fn variant_args(&self, input: &Path, variant_dir: &Path, rung: &VariantSpec) -> Vec<String> {
        let playlist_path = variant_dir.join("index.m3u8");
        let segment_pattern = variant_dir.join("segment_%03d.ts");

        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!("scale={}:{}", rung.width, rung.height),
            "-c:v".to_string(),
            self.video_codec.clone(),
        ];

        match self.video_codec.as_str() {
            // -rc/-cq and the p-presets are NVENC rate-control knobs.
            "h264_nvenc" | "hevc_nvenc" => {
                args.extend_from_slice(&[
                    "-rc".to_string(),
                    "vbr".to_string(),
                    "-cq".to_string(),
                    rung.cq.to_string(),
                    "-preset".to_string(),
                    rung.preset.to_string(),
                ]);
            }
            _ => {
                args.extend_from_slice(&["-preset".to_string(), "fast".to_string()]);
            }
        }

        args.extend_from_slice(&[
            "-b:v".to_string(),
            format!("{}k", rung.video_kbps),
            "-maxrate".to_string(),
            format!("{}k", rung.max_rate_kbps),
            "-bufsize".to_string(),
            format!("{}k", rung.buf_size_kbps),
            "-c:a".to_string(),
            "aac".to_string(),
            "-ar".to_string(),
            AUDIO_SAMPLE_RATE.to_string(),
            "-b:a".to_string(),
            format!("{}k", AUDIO_KBPS),
            "-f".to_string(),
            "hls".to_string(),
            "-hls_time".to_string(),
            self.hls_segment_seconds.to_string(),
            "-hls_list_size".to_string(),
            "0".to_string(),
            "-hls_segment_filename".to_string(),
            segment_pattern.to_string_lossy().to_string(),
            playlist_path.to_string_lossy().to_string(),
        ]);

        args
    }

    fn preview_args(&self, input: &Path, out_dir: &Path, max_seconds: f64) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-t".to_string(),
            max_seconds.to_string(),
            "-an".to_string(),
            "-vf".to_string(),
            format!("scale={}", PREVIEW_SCALE),
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-b:v".to_string(),
            format!("{}k", PREVIEW_VIDEO_KBPS),
            "-f".to_string(),
            "hls".to_string(),
            "-hls_time".to_string(),
            self.preview_segment_seconds.to_string(),
            "-hls_list_size".to_string(),
            "0".to_string(),
            "-hls_segment_filename".to_string(),
            out_dir.join("segment_%03d.ts").to_string_lossy().to_string(),
            out_dir.join("index.m3u8").to_string_lossy().to_string(),
        ]
    }

    fn sprite_args(input: &Path, out_dir: &Path, interval_seconds: f64) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!(
                "fps=1/{},scale={}:{}",
                interval_seconds, SPRITE_FRAME_WIDTH, SPRITE_FRAME_HEIGHT
            ),
            out_dir
                .join("preview_%03d.jpg")
                .to_string_lossy()
                .to_string(),
        ]
    }

    fn probe_args(input: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            input.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    #[tracing::instrument(skip(self))]
    async fn probe_duration(&self, input: &Path) -> EncodeResult<f64> {
        let start = std::time::Instant::now();

        let stdout = self
            .run_tool(&self.ffprobe_path, &Self::probe_args(input))
            .await?;

        let text = String::from_utf8_lossy(&stdout);
        let trimmed = text.trim();
        let duration = trimmed
            .parse::<f64>()
            .map_err(|_| EncodeError::ProbeParse(trimmed.to_string()))?;
        if !duration.is_finite() || duration < 0.0 {
            return Err(EncodeError::ProbeParse(trimmed.to_string()));
        }

        tracing::info!(
            video_duration = duration,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Video probe completed"
        );

        Ok(duration)
    }

    #[tracing::instrument(skip(self))]
    async fn package_abr(&self, input: &Path, out_dir: &Path) -> EncodeResult<()> {
        let start = std::time::Instant::now();

        // Rungs run one at a time; the scheduler already counts the whole
        // job as a single unit of encoder work.
        for (index, rung) in LADDER.iter().enumerate() {
            let variant_dir = out_dir.join(format!("v{index}"));
            tokio::fs::create_dir_all(&variant_dir).await?;

            tracing::debug!(
                rung = rung.name,
                codec = %self.video_codec,
                "Packaging rendition"
            );
            let args = self.variant_args(input, &variant_dir, rung);
            self.run_tool(&self.ffmpeg_path, &args).await?;
        }

        let master = ladder::master_playlist(&LADDER);
        tokio::fs::write(out_dir.join("master.m3u8"), master).await?;

        tracing::info!(
            renditions = LADDER.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Adaptive bitrate packaging complete"
        );

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn package_preview(
        &self,
        input: &Path,
        out_dir: &Path,
        max_seconds: f64,
    ) -> EncodeResult<()> {
        let start = std::time::Instant::now();

        tokio::fs::create_dir_all(out_dir).await?;
        let args = self.preview_args(input, out_dir, max_seconds);
        self.run_tool(&self.ffmpeg_path, &args).await?;

        tracing::info!(
            max_seconds = max_seconds,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Preview packaging complete"
        );

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn package_sprites(
        &self,
        input: &Path,
        out_dir: &Path,
        interval_seconds: f64,
    ) -> EncodeResult<u32> {
        let start = std::time::Instant::now();

        let duration = self.probe_duration(input).await?;

        tokio::fs::create_dir_all(out_dir).await?;
        let args = Self::sprite_args(input, out_dir, interval_seconds);
        self.run_tool(&self.ffmpeg_path, &args).await?;

        let mut frames = 0u32;
        let mut entries = tokio::fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("preview_") && name.ends_with(".jpg") {
                frames += 1;
            }
        }

        tracing::info!(
            video_duration = duration,
            interval_seconds = interval_seconds,
            frames = frames,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Sprite packaging complete"
        );

        Ok(frames)
    }
}
