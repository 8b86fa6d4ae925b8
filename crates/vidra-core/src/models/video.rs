use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scrub-preview metadata stored alongside a video.
///
/// `frame_interval` is the sampling interval actually used when the sprite
/// frames were generated; players derive the frame index for a seek position
/// from it, so it must match the generated files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewMeta {
    pub sprite_base_url: String,
    pub frame_interval: f64,
    pub sprite_count: u32,
    pub cols: u32,
    pub rows: u32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl PreviewMeta {
    /// Frames one sprite sheet holds when the front end tiles them.
    pub fn frames_per_sheet(&self) -> u32 {
        self.cols * self.rows
    }
}

/// A committed video: the catalog record written once every artifact of the
/// video exists in the object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAsset {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub video_manifest_url: String,
    pub preview_manifest_url: String,
    pub thumbnail_url: String,
    pub preview_meta: PreviewMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload for the catalog; timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewVideoAsset {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub video_manifest_url: String,
    pub preview_manifest_url: String,
    pub thumbnail_url: String,
    pub preview_meta: PreviewMeta,
}

/// One page of catalog results plus the totals pagination UIs consume.
#[derive(Debug, Clone, Serialize)]
pub struct VideoPage {
    pub items: Vec<VideoAsset>,
    pub total: i64,
    pub total_pages: i64,
}

impl VideoPage {
    /// Assemble a page, deriving `total_pages` from the page size the
    /// query ran with.
    pub fn new(items: Vec<VideoAsset>, total: i64, limit: i64) -> Self {
        let total_pages = if limit <= 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            items,
            total,
            total_pages,
        }
    }
}
