use thiserror::Error;
use vidra_catalog::CatalogError;
use vidra_storage::StorageError;
use vidra_transcode::EncodeError;

/// Pipeline failure, classified by the collaborator that produced it.
///
/// `Input` covers everything the caller can fix (missing files, unreadable
/// paths); the wrapped variants are internal faults. An HTTP surface maps
/// the former to 400 and the rest to 500 via [`IngestError::http_status`].
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Catalog operation failed: {0}")]
    Catalog(#[from] CatalogError),
}

impl IngestError {
    /// Status code an HTTP caller should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            IngestError::Input(_) => 400,
            _ => 500,
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_client_faults() {
        let err = IngestError::Input("video file not found".to_string());
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn wrapped_errors_are_server_faults() {
        let encode: IngestError = EncodeError::ProbeParse("N/A".to_string()).into();
        assert_eq!(encode.http_status(), 500);

        let storage: IngestError = StorageError::UploadFailed("timeout".to_string()).into();
        assert_eq!(storage.http_status(), 500);

        let catalog: IngestError = CatalogError::NotFound(uuid::Uuid::nil()).into();
        assert_eq!(catalog.http_status(), 500);
    }

    #[test]
    fn messages_name_the_failing_side() {
        let err = IngestError::Input("thumbnail missing".to_string());
        assert!(err.to_string().contains("Invalid input"));

        let err: IngestError = StorageError::DeleteFailed("503".to_string()).into();
        assert!(err.to_string().contains("Storage operation failed"));
    }
}
