use std::fmt;

/// Stages an ingestion moves through, in order. `Failed` is reachable from
/// every non-terminal stage; `Committed` and `Failed` are terminal.
///
/// The stage is log-only state: nothing is persisted until the final
/// catalog write, so a crash at any stage leaves no record behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Transcoding,
    UploadingPreview,
    UploadingRenditions,
    UploadingSprites,
    UploadingThumbnail,
    Committed,
    Failed,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Received => "RECEIVED",
            IngestStage::Transcoding => "TRANSCODING",
            IngestStage::UploadingPreview => "UPLOADING_PREVIEW",
            IngestStage::UploadingRenditions => "UPLOADING_RENDITIONS",
            IngestStage::UploadingSprites => "UPLOADING_SPRITES",
            IngestStage::UploadingThumbnail => "UPLOADING_THUMBNAIL",
            IngestStage::Committed => "COMMITTED",
            IngestStage::Failed => "FAILED",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_stable() {
        assert_eq!(IngestStage::Received.to_string(), "RECEIVED");
        assert_eq!(IngestStage::UploadingPreview.to_string(), "UPLOADING_PREVIEW");
        assert_eq!(IngestStage::Committed.to_string(), "COMMITTED");
    }
}
