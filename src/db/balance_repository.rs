use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, error, info, instrument};

use crate::balance::{Month, MonthlyValues, ParseResult, SalesSeries};
use crate::db::{
    BalanceMetadataRow, BalanceMonthlyRow, BalanceYearView, DbError, SalesMonthlyRow,
    SalesYearView,
};

#[derive(Clone)]
pub struct BalanceRepository {
    pool: SqlitePool,
}

impl BalanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace everything stored for the result's (year, source) in one transaction
    #[instrument(skip(self, result), fields(year = result.year, source_id = %result.source_id))]
    pub async fn save_result(&self, result: &ParseResult) -> Result<(), DbError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for month in Month::ALL {
            let i = month.index();
            let energy = &result.energy;
            sqlx::query(
                r#"
                INSERT INTO balance_monthly (
                    year, month, regulados, libres, coes, servicios_aux, perdidas,
                    total, source_id, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (year, month, source_id) DO UPDATE SET
                    regulados = excluded.regulados,
                    libres = excluded.libres,
                    coes = excluded.coes,
                    servicios_aux = excluded.servicios_aux,
                    perdidas = excluded.perdidas,
                    total = excluded.total,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(result.year)
            .bind(month.code())
            .bind(energy.regulados[i])
            .bind(energy.libres[i])
            .bind(energy.coes[i])
            .bind(energy.servicios_aux[i])
            .bind(energy.perdidas[i])
            .bind(result.total_for(month))
            .bind(&result.source_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(
                    year = result.year,
                    month = %month,
                    error = %e,
                    "Failed to upsert monthly balance"
                );
                e
            })?;
        }

        Self::replace_sales(&mut tx, result.year, &result.source_id, result.sales.as_ref(), now)
            .await?;

        let observed_months = serde_json::to_string(&result.observed_months).map_err(|source| {
            DbError::InvalidJson {
                column: "observed_months",
                source,
            }
        })?;
        let warnings = serde_json::to_string(&result.warnings).map_err(|source| {
            DbError::InvalidJson {
                column: "warnings",
                source,
            }
        })?;

        sqlx::query(
            r#"
            INSERT INTO balance_metadata (
                year, source_id, observed_months, last_month, month_count,
                sheet_name, warnings, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (year, source_id) DO UPDATE SET
                observed_months = excluded.observed_months,
                last_month = excluded.last_month,
                month_count = excluded.month_count,
                sheet_name = excluded.sheet_name,
                warnings = excluded.warnings,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(result.year)
        .bind(&result.source_id)
        .bind(observed_months)
        .bind(result.last_month.map(|m| m.code()))
        .bind(result.observed_months.len() as i64)
        .bind(&result.sheet_name)
        .bind(warnings)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            "Stored year {} for source {} ({} observed months)",
            result.year,
            result.source_id,
            result.observed_months.len()
        );
        Ok(())
    }

    async fn replace_sales(
        tx: &mut Transaction<'_, Sqlite>,
        year: i32,
        source_id: &str,
        sales: Option<&SalesSeries>,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query("DELETE FROM balance_sales_monthly WHERE year = ? AND source_id = ?")
            .bind(year)
            .bind(source_id)
            .execute(&mut **tx)
            .await?;

        let Some(sales) = sales else {
            return Ok(());
        };

        for month in Month::ALL {
            let i = month.index();
            sqlx::query(
                r#"
                INSERT INTO balance_sales_monthly (
                    year, month, regulados, libres, coes_spot, otros, source_id, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(year)
            .bind(month.code())
            .bind(sales.regulados[i])
            .bind(sales.libres[i])
            .bind(sales.coes_spot[i])
            .bind(sales.otros[i])
            .bind(source_id)
            .bind(now)
            .execute(&mut **tx)
            .await?;
        }
        debug!("Stored sales series for year {}", year);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_years(&self) -> Result<Vec<i32>, DbError> {
        let years: Vec<i64> =
            sqlx::query_scalar("SELECT DISTINCT year FROM balance_monthly ORDER BY year")
                .fetch_all(&self.pool)
                .await?;

        debug!("Found {} years", years.len());
        Ok(years.into_iter().map(|y| y as i32).collect())
    }

    /// Sources holding rows for `year`, alphabetical
    #[instrument(skip(self))]
    pub async fn sources_for_year(&self, year: i32) -> Result<Vec<String>, DbError> {
        let sources = sqlx::query_scalar(
            "SELECT DISTINCT source_id FROM balance_monthly WHERE year = ? ORDER BY source_id",
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        Ok(sources)
    }

    /// Rebuild the stored year on the canonical month axis; `None` when nothing is stored
    #[instrument(skip(self), fields(year = year, source_id = %source_id))]
    pub async fn fetch_year(
        &self,
        year: i32,
        source_id: &str,
    ) -> Result<Option<BalanceYearView>, DbError> {
        let rows = sqlx::query_as::<_, BalanceMonthlyRow>(
            r#"
            SELECT year, month, regulados, libres, coes, servicios_aux, perdidas,
                   total, source_id, updated_at
            FROM balance_monthly
            WHERE year = ? AND source_id = ?
            "#,
        )
        .bind(year)
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            debug!("No rows stored");
            return Ok(None);
        }

        let mut regulados: MonthlyValues = [0.0; 12];
        let mut libres: MonthlyValues = [0.0; 12];
        let mut coes: MonthlyValues = [0.0; 12];
        let mut servicios_aux: MonthlyValues = [0.0; 12];
        let mut perdidas: MonthlyValues = [0.0; 12];
        let mut total: MonthlyValues = [0.0; 12];
        for row in &rows {
            let Ok(month) = row.month.parse::<Month>() else {
                debug!("Ignoring row with unknown month '{}'", row.month);
                continue;
            };
            let i = month.index();
            regulados[i] = row.regulados;
            libres[i] = row.libres;
            coes[i] = row.coes;
            servicios_aux[i] = row.servicios_aux;
            perdidas[i] = row.perdidas;
            total[i] = row.total;
        }
        let updated_at = rows.iter().map(|r| r.updated_at).max();

        let sales = self.fetch_sales(year, source_id).await?;

        let metadata = sqlx::query_as::<_, BalanceMetadataRow>(
            r#"
            SELECT year, source_id, observed_months, last_month, month_count,
                   sheet_name, warnings, updated_at
            FROM balance_metadata
            WHERE year = ? AND source_id = ?
            "#,
        )
        .bind(year)
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;

        let (observed_months, last_month, sheet_name, warnings) = match metadata {
            Some(meta) => {
                let observed: Vec<Month> = serde_json::from_str(&meta.observed_months)
                    .map_err(|source| DbError::InvalidJson {
                        column: "observed_months",
                        source,
                    })?;
                let warnings: Vec<String> =
                    serde_json::from_str(&meta.warnings).map_err(|source| {
                        DbError::InvalidJson {
                            column: "warnings",
                            source,
                        }
                    })?;
                let last_month = meta
                    .last_month
                    .as_deref()
                    .and_then(|m| m.parse::<Month>().ok())
                    .or_else(|| observed.last().copied());
                (observed, last_month, meta.sheet_name, warnings)
            }
            None => {
                debug!("No metadata stored, assuming a full year");
                (Month::ALL.to_vec(), Some(Month::Dic), None, Vec::new())
            }
        };

        Ok(Some(BalanceYearView {
            year,
            months: Month::ALL,
            month_count: observed_months.len(),
            observed_months,
            last_month,
            sheet_name,
            warnings,
            source_id: source_id.to_string(),
            regulados,
            libres,
            coes,
            servicios_aux,
            perdidas,
            total,
            sales,
            updated_at,
        }))
    }

    async fn fetch_sales(
        &self,
        year: i32,
        source_id: &str,
    ) -> Result<Option<SalesYearView>, DbError> {
        let rows = sqlx::query_as::<_, SalesMonthlyRow>(
            r#"
            SELECT year, month, regulados, libres, coes_spot, otros, source_id, updated_at
            FROM balance_sales_monthly
            WHERE year = ? AND source_id = ?
            "#,
        )
        .bind(year)
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut view = SalesYearView {
            regulados: [0.0; 12],
            libres: [0.0; 12],
            coes_spot: [0.0; 12],
            otros: [0.0; 12],
        };
        for row in rows {
            if let Ok(month) = row.month.parse::<Month>() {
                let i = month.index();
                view.regulados[i] = row.regulados;
                view.libres[i] = row.libres;
                view.coes_spot[i] = row.coes_spot;
                view.otros[i] = row.otros;
            }
        }
        Ok(Some(view))
    }
}
