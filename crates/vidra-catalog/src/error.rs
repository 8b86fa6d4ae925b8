use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Video not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
