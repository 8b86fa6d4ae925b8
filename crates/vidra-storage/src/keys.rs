//! Storage key construction and content-type inference.
//!
//! Every remote artifact of a video lives under its id, so the id is the one
//! prefix to delete when the video is removed. Keys are built here so all
//! backends and the pipeline agree on the layout.

use std::path::Path;
use uuid::Uuid;

/// Namespace for the adaptive-bitrate package (`{id}/hls/...`).
pub const HLS_NAMESPACE: &str = "hls";
/// Namespace for the hover preview stream and sprite frames (`{id}/preview/...`).
pub const PREVIEW_NAMESPACE: &str = "preview";

/// Key for one file of an artifact tree: `{id}/{namespace}/{relative_path}`.
///
/// `relative_path` must already use `/` separators.
pub fn artifact_key(video_id: &Uuid, namespace: &str, relative_path: &str) -> String {
    format!("{}/{}/{}", video_id, namespace, relative_path)
}

/// Key of the top-level adaptive-bitrate manifest.
pub fn master_manifest_key(video_id: &Uuid) -> String {
    artifact_key(video_id, HLS_NAMESPACE, "master.m3u8")
}

/// Key of the hover-preview stream manifest.
pub fn preview_manifest_key(video_id: &Uuid) -> String {
    artifact_key(video_id, PREVIEW_NAMESPACE, "index.m3u8")
}

/// Base key the sprite frame names are appended to by the player.
pub fn sprite_base_key(video_id: &Uuid) -> String {
    format!("{}/{}", video_id, PREVIEW_NAMESPACE)
}

/// Thumbnail key, keeping the uploaded file's extension when it has one.
pub fn thumbnail_key(video_id: &Uuid, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!("{}/thumbnail.{}", video_id, ext),
        _ => format!("{}/thumbnail", video_id),
    }
}

/// Content type for an artifact file, inferred from its extension.
///
/// Manifests get the HLS playlist type, segments the MPEG transport-stream
/// type; everything unrecognized falls back to an opaque byte stream.
pub fn content_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/MP2T",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}
