//! Vidra Core Library
//!
//! Shared configuration, telemetry bootstrap, and domain models used by all
//! Vidra components.

pub mod config;
pub mod models;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use models::{NewVideoAsset, PreviewMeta, VideoAsset, VideoPage};
pub use telemetry::init_telemetry;
