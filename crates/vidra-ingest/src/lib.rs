//! Vidra Ingest Library
//!
//! The ingestion pipeline that turns an uploaded video and thumbnail into a
//! committed catalog record: package the adaptive-bitrate rendition set, the
//! hover preview, and the scrub sprites; upload every artifact under the
//! video's id prefix; write the record last. Working files are cleaned up
//! whatever the outcome.

mod cleanup;
pub mod error;
pub mod pipeline;
pub mod stage;

// Re-export commonly used types
pub use error::{IngestError, IngestResult};
pub use pipeline::{IngestRequest, IngestionPipeline, PipelineSettings};
pub use stage::IngestStage;
