use crate::error::CatalogResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;
use vidra_core::models::{NewVideoAsset, PreviewMeta, VideoAsset, VideoPage};

/// Catalog operations the ingestion pipeline and the read surface need.
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// Insert a committed video. Callers only invoke this once every URL the
    /// record references resolves to a stored artifact.
    async fn create(&self, asset: NewVideoAsset) -> CatalogResult<VideoAsset>;

    async fn get(&self, id: Uuid) -> CatalogResult<Option<VideoAsset>>;

    /// Newest-first page of the catalog plus pagination totals.
    async fn list(&self, limit: i64, offset: i64) -> CatalogResult<VideoPage>;

    /// Case-insensitive substring match over title and description.
    async fn search(&self, query: &str, limit: i64, offset: i64) -> CatalogResult<VideoPage>;

    /// Remove the record. Returns false when the id was never committed.
    async fn delete(&self, id: Uuid) -> CatalogResult<bool>;
}

/// Database row for the videos table.
#[derive(Debug, FromRow)]
struct VideoRow {
    id: Uuid,
    title: String,
    description: String,
    video_manifest_url: String,
    preview_manifest_url: String,
    thumbnail_url: String,
    preview_meta: Json<PreviewMeta>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VideoRow> for VideoAsset {
    fn from(row: VideoRow) -> Self {
        VideoAsset {
            id: row.id,
            title: row.title,
            description: row.description,
            video_manifest_url: row.video_manifest_url,
            preview_manifest_url: row.preview_manifest_url,
            thumbnail_url: row.thumbnail_url,
            preview_meta: row.preview_meta.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn like_pattern(query: &str) -> String {
    format!("%{}%", query)
}

/// Postgres-backed catalog.
#[derive(Clone)]
pub struct PgVideoCatalog {
    pool: PgPool,
}

impl PgVideoCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoCatalog for PgVideoCatalog {
    async fn create(&self, asset: NewVideoAsset) -> CatalogResult<VideoAsset> {
        let row: VideoRow = sqlx::query_as::<Postgres, VideoRow>(
            r#"
            INSERT INTO videos (
                id, title, description,
                video_manifest_url, preview_manifest_url, thumbnail_url,
                preview_meta
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(asset.id)
        .bind(&asset.title)
        .bind(&asset.description)
        .bind(&asset.video_manifest_url)
        .bind(&asset.preview_manifest_url)
        .bind(&asset.thumbnail_url)
        .bind(Json(&asset.preview_meta))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(video_id = %row.id, title = %row.title, "Video record created");

        Ok(row.into())
    }

    async fn get(&self, id: Uuid) -> CatalogResult<Option<VideoAsset>> {
        let row: Option<VideoRow> =
            sqlx::query_as::<Postgres, VideoRow>("SELECT * FROM videos WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(VideoAsset::from))
    }

    async fn list(&self, limit: i64, offset: i64) -> CatalogResult<VideoPage> {
        let rows: Vec<VideoRow> = sqlx::query_as::<Postgres, VideoRow>(
            "SELECT * FROM videos ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM videos")
            .fetch_one(&self.pool)
            .await?;

        Ok(VideoPage::new(
            rows.into_iter().map(VideoAsset::from).collect(),
            total,
            limit,
        ))
    }

    async fn search(&self, query: &str, limit: i64, offset: i64) -> CatalogResult<VideoPage> {
        let pattern = like_pattern(query);

        let rows: Vec<VideoRow> = sqlx::query_as::<Postgres, VideoRow>(
            r#"
            SELECT * FROM videos
            WHERE title ILIKE $1 OR description ILIKE $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM videos WHERE title ILIKE $1 OR description ILIKE $1",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok(VideoPage::new(
            rows.into_iter().map(VideoAsset::from).collect(),
            total,
            limit,
        ))
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        tracing::info!(video_id = %id, deleted = deleted, "Video record delete finished");

        Ok(deleted)
    }
}
