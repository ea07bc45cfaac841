use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::balance::{Month, MonthlyValues};

// Database entity models
#[derive(Debug, Clone, FromRow)]
pub struct BalanceMonthlyRow {
    pub year: i64,
    pub month: String,
    pub regulados: f64,
    pub libres: f64,
    pub coes: f64,
    pub servicios_aux: f64,
    pub perdidas: f64,
    pub total: f64,
    pub source_id: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SalesMonthlyRow {
    pub year: i64,
    pub month: String,
    pub regulados: f64,
    pub libres: f64,
    pub coes_spot: f64,
    pub otros: f64,
    pub source_id: String,
    pub updated_at: DateTime<Utc>,
}

/// Per-year metadata; `observed_months` and `warnings` are JSON arrays
#[derive(Debug, Clone, FromRow)]
pub struct BalanceMetadataRow {
    pub year: i64,
    pub source_id: String,
    pub observed_months: String,
    pub last_month: Option<String>,
    pub month_count: i64,
    pub sheet_name: Option<String>,
    pub warnings: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Source {
    pub source_id: String,
    pub dataset_id: String,
    pub file_name: Option<String>,
    pub enabled: bool,
    pub last_ingested: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one import attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EtlStatus {
    #[sqlx(rename = "SUCCESS")]
    Success,
    #[sqlx(rename = "WARNING")]
    Warning,
    #[sqlx(rename = "ERROR")]
    Error,
}

#[derive(Debug, Clone, FromRow)]
pub struct EtlRunRow {
    pub id: i64,
    pub source_id: String,
    pub dataset_id: String,
    pub status: EtlStatus,
    pub message: String,
    pub warnings: String,
    pub ran_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EtlRun {
    pub id: i64,
    pub source_id: String,
    pub dataset_id: String,
    pub status: EtlStatus,
    pub message: String,
    pub warnings: Vec<String>,
    pub ran_at: DateTime<Utc>,
}

// API response DTOs (built by repositories, served as-is by the API)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SalesYearView {
    pub regulados: MonthlyValues,
    pub libres: MonthlyValues,
    pub coes_spot: MonthlyValues,
    pub otros: MonthlyValues,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BalanceYearView {
    pub year: i32,
    pub months: [Month; 12],
    pub observed_months: Vec<Month>,
    pub month_count: usize,
    pub last_month: Option<Month>,
    pub sheet_name: Option<String>,
    pub warnings: Vec<String>,
    pub source_id: String,
    pub regulados: MonthlyValues,
    pub libres: MonthlyValues,
    pub coes: MonthlyValues,
    pub servicios_aux: MonthlyValues,
    pub perdidas: MonthlyValues,
    pub total: MonthlyValues,
    pub sales: Option<SalesYearView>,
    pub updated_at: Option<DateTime<Utc>>,
}
