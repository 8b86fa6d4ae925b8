//! Local workspace reclamation after an ingestion run.

use std::io::ErrorKind;
use std::path::Path;
use uuid::Uuid;

/// Remove the files and directories one ingestion run owned.
///
/// Runs after success and failure alike. Missing paths are fine (a failed
/// run may never have created them); any other error is logged and
/// swallowed so cleanup can never replace the pipeline's own result.
pub(crate) async fn remove_workspace(video_id: Uuid, files: &[&Path], dirs: &[&Path]) {
    for path in files {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(
                    video_id = %video_id,
                    path = %path.display(),
                    "Removed temp file"
                );
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    video_id = %video_id,
                    path = %path.display(),
                    error = %e,
                    "Temp file cleanup failed"
                );
            }
        }
    }

    for path in dirs {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => {
                tracing::debug!(
                    video_id = %video_id,
                    path = %path.display(),
                    "Removed temp directory"
                );
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    video_id = %video_id,
                    path = %path.display(),
                    error = %e,
                    "Temp directory cleanup failed"
                );
            }
        }
    }
}
