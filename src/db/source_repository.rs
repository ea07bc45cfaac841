use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use crate::db::{DbError, Source};

#[derive(Clone)]
pub struct SourceRepository {
    pool: SqlitePool,
}

impl SourceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a source; `created_at` is kept from the first registration
    #[instrument(skip(self), fields(source_id = %source_id))]
    pub async fn upsert(
        &self,
        source_id: &str,
        dataset_id: &str,
        file_name: Option<&str>,
        last_ingested: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO sources (source_id, dataset_id, file_name, enabled, last_ingested, created_at)
            VALUES (?, ?, ?, 1, ?, ?)
            ON CONFLICT (source_id) DO UPDATE SET
                dataset_id = excluded.dataset_id,
                file_name = excluded.file_name,
                last_ingested = excluded.last_ingested
            "#,
        )
        .bind(source_id)
        .bind(dataset_id)
        .bind(file_name)
        .bind(last_ingested)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!("Source upserted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Source>, DbError> {
        let sources = sqlx::query_as::<_, Source>(
            r#"
            SELECT source_id, dataset_id, file_name, enabled, last_ingested, created_at
            FROM sources
            ORDER BY source_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} sources", sources.len());
        Ok(sources)
    }

    #[instrument(skip(self), fields(source_id = %source_id))]
    pub async fn find_by_id(&self, source_id: &str) -> Result<Option<Source>, DbError> {
        let source = sqlx::query_as::<_, Source>(
            r#"
            SELECT source_id, dataset_id, file_name, enabled, last_ingested, created_at
            FROM sources
            WHERE source_id = ?
            "#,
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(source)
    }
}
