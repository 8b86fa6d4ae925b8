pub mod video;

pub use video::{NewVideoAsset, PreviewMeta, VideoAsset, VideoPage};
