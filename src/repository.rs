use axum::async_trait;
use chrono::Duration;
use sqlx::{migrate::MigrateError, PgPool};

use crate::models::File;

/// Relational store of [`File`] rows.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Insert a row. The store assigns `id` and `created_at`, and sets
    /// `expiry_date` to `created_at + ttl`.
    async fn insert_file(&self, insert: InsertFile) -> sqlx::Result<File>;

    async fn fetch_file(&self, id: i64) -> sqlx::Result<Option<File>>;

    /// Every row, expired or not, in whatever order the store yields them.
    async fn fetch_files(&self) -> sqlx::Result<Vec<File>>;
}

pub struct InsertFile {
    pub filename: String,
    pub file_url: String,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct PgFiles {
    db: PgPool,
}

impl PgFiles {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!().run(&self.db).await
    }
}

#[async_trait]
impl FileRepository for PgFiles {
    async fn insert_file(&self, insert: InsertFile) -> sqlx::Result<File> {
        // created_at defaults to the same NOW() so the ttl offset is exact
        let res = sqlx::query_as::<_, File>(
            r#"
            INSERT INTO files
                (filename, file_url, expiry_date)
            VALUES
                ($1, $2, NOW() + make_interval(secs => $3))
            RETURNING id, filename, file_url, expiry_date, created_at
            "#,
        )
        .bind(insert.filename)
        .bind(insert.file_url)
        .bind(insert.ttl.num_seconds() as f64)
        .fetch_one(&self.db)
        .await?;
        Ok(res)
    }

    async fn fetch_file(&self, id: i64) -> sqlx::Result<Option<File>> {
        let res = sqlx::query_as::<_, File>(
            "SELECT id, filename, file_url, expiry_date, created_at FROM files WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(res)
    }

    async fn fetch_files(&self) -> sqlx::Result<Vec<File>> {
        let res = sqlx::query_as::<_, File>(
            "SELECT id, filename, file_url, expiry_date, created_at FROM files",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(res)
    }
}
