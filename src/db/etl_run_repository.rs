use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

use crate::db::{DbError, EtlRun, EtlRunRow, EtlStatus};

#[derive(Clone)]
pub struct EtlRunRepository {
    pool: SqlitePool,
}

impl EtlRunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one run to the audit log, returning its id
    #[instrument(skip(self, message, warnings), fields(source_id = %source_id, status = ?status))]
    pub async fn record(
        &self,
        source_id: &str,
        dataset_id: &str,
        status: EtlStatus,
        message: &str,
        warnings: &[String],
    ) -> Result<i64, DbError> {
        let warnings_json = serde_json::to_string(warnings).map_err(|source| {
            DbError::InvalidJson {
                column: "warnings",
                source,
            }
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO etl_runs (source_id, dataset_id, status, message, warnings, ran_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(source_id)
        .bind(dataset_id)
        .bind(status)
        .bind(message)
        .bind(warnings_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            "Recorded ETL run {} ({:?}, {} warnings): {}",
            id,
            status,
            warnings.len(),
            message
        );
        Ok(id)
    }

    /// Most recent runs first
    #[instrument(skip(self))]
    pub async fn recent(&self, limit: i64) -> Result<Vec<EtlRun>, DbError> {
        let rows = sqlx::query_as::<_, EtlRunRow>(
            r#"
            SELECT id, source_id, dataset_id, status, message, warnings, ran_at
            FROM etl_runs
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} ETL runs", rows.len());
        rows.into_iter()
            .map(|row| -> Result<EtlRun, DbError> {
                let warnings = serde_json::from_str(&row.warnings).map_err(|source| {
                    DbError::InvalidJson {
                        column: "warnings",
                        source,
                    }
                })?;
                Ok(EtlRun {
                    id: row.id,
                    source_id: row.source_id,
                    dataset_id: row.dataset_id,
                    status: row.status,
                    message: row.message,
                    warnings,
                    ran_at: row.ran_at,
                })
            })
            .collect()
    }
}
