//! Video packaging: an encoder abstraction over ffmpeg plus the admission
//! scheduler that serializes access to the hardware encoder.

pub mod encoder;
pub mod ffmpeg;
pub mod ladder;
pub mod scheduler;

pub use encoder::{
    sprite_frame_count, EncodeError, EncodeResult, Encoder, SPRITE_FRAME_HEIGHT,
    SPRITE_FRAME_WIDTH,
};
pub use ffmpeg::FfmpegEncoder;
pub use ladder::{master_playlist, VariantSpec, LADDER};
pub use scheduler::{TranscodeJob, TranscodeScheduler};
