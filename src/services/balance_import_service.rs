use backon::{ConstantBuilder, Retryable};
use chrono::Utc;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::balance::{
    BalanceError, BalanceTransformer, EnergySeries, Month, MonthlyValues, ParseResult,
};
use crate::db::{BalanceRepository, DbError, EtlRunRepository, EtlStatus, SourceRepository};
use crate::events::{BalanceEvent, EventBroker, BALANCE_DATASET};
use crate::importers::{LoadError, WorkbookLoader};

const DEFAULT_RETRY_COUNT: usize = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(800);

/// Years written when seeding an empty database with sample data
pub const SAMPLE_YEARS: [i32; 3] = [2023, 2024, 2025];

/// Error types for balance import operations
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Archivo {0} no encontrado")]
    FileNotFound(PathBuf),

    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Parse failed: {0}")]
    Balance(#[from] BalanceError),

    #[error("No balance year could be parsed from {0}")]
    NoResults(PathBuf),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Parser task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// What one successful import wrote
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub source_id: String,
    pub years: Vec<i32>,
    pub warnings: Vec<String>,
    pub run_id: i64,
    pub duration_secs: f64,
}

/// Loads a workbook, runs the transformer and persists every parsed year.
///
/// Every call to [`process_file`](Self::process_file) leaves one row in `etl_runs` and
/// publishes the matching events.
#[derive(Clone)]
pub struct BalanceImportService {
    transformer: BalanceTransformer,
    balance_repo: BalanceRepository,
    source_repo: SourceRepository,
    run_repo: EtlRunRepository,
    broker: EventBroker,
    retry_count: usize,
    retry_delay: Duration,
}

impl BalanceImportService {
    pub fn new(pool: SqlitePool, broker: EventBroker, source_id: &str) -> Self {
        Self {
            transformer: BalanceTransformer::new(source_id),
            balance_repo: BalanceRepository::new(pool.clone()),
            source_repo: SourceRepository::new(pool.clone()),
            run_repo: EtlRunRepository::new(pool),
            broker,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// `count` total attempts, `delay` between consecutive attempts
    pub fn with_retry(mut self, count: usize, delay: Duration) -> Self {
        self.retry_count = count.max(1);
        self.retry_delay = delay;
        self
    }

    pub fn source_id(&self) -> &str {
        self.transformer.source_id()
    }

    /// Import one workbook and record the outcome.
    ///
    /// A missing file is recorded as `WARNING` without events; any other failure is
    /// recorded as `ERROR` and broadcast as `ETL_ERROR`.
    #[instrument(skip(self), fields(path = %path.display(), source_id = %self.source_id()))]
    pub async fn process_file(&self, path: &Path) -> Result<ImportSummary, ImportError> {
        info!("Processing workbook {}", path.display());

        match self.import(path).await {
            Ok(summary) => Ok(summary),
            Err(ImportError::FileNotFound(missing)) => {
                let msg = format!("Archivo {} no encontrado. Se omite.", missing.display());
                warn!("{}", msg);
                self.record_failure(EtlStatus::Warning, &msg).await;
                Err(ImportError::FileNotFound(missing))
            }
            Err(e) => {
                let msg = format!("Error procesando {}: {}", path.display(), e);
                error!("{}", msg);
                self.record_failure(EtlStatus::Error, &msg).await;
                self.broker.publish(BalanceEvent::etl_error(
                    self.source_id(),
                    msg.clone(),
                    vec![msg],
                ));
                Err(e)
            }
        }
    }

    async fn record_failure(&self, status: EtlStatus, msg: &str) {
        if let Err(e) = self
            .run_repo
            .record(
                self.source_id(),
                BALANCE_DATASET,
                status,
                msg,
                &[msg.to_string()],
            )
            .await
        {
            error!("Failed to record ETL run: {}", e);
        }
    }

    async fn import(&self, path: &Path) -> Result<ImportSummary, ImportError> {
        let start_time = Instant::now();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.to_path_buf()));
        }

        let results = self.parse_with_retries(path).await?;
        if results.is_empty() {
            return Err(ImportError::NoResults(path.to_path_buf()));
        }

        let mut run_warnings = Vec::new();
        for result in &results {
            self.balance_repo.save_result(result).await?;
            run_warnings.extend(
                result
                    .warnings
                    .iter()
                    .map(|w| format!("{}: {}", result.year, w)),
            );
            self.broker.publish(BalanceEvent::dataset_updated(
                BALANCE_DATASET,
                result.source_id.as_str(),
                Some(result.year),
                format!("Balance actualizado para {}", result.year),
                result.warnings.clone(),
            ));
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        self.source_repo
            .upsert(
                self.source_id(),
                BALANCE_DATASET,
                file_name.as_deref(),
                Utc::now(),
            )
            .await?;

        let run_id = self
            .run_repo
            .record(
                self.source_id(),
                BALANCE_DATASET,
                EtlStatus::Success,
                &format!("Ingestado {} hojas", results.len()),
                &run_warnings,
            )
            .await?;

        if !run_warnings.is_empty() {
            warn!("Import finished with {} warnings", run_warnings.len());
        }

        let duration = start_time.elapsed();
        let years: Vec<i32> = results.iter().map(|r| r.year).collect();
        info!(
            "✓ Imported years {:?} from {} ({:.1}s)",
            years,
            path.display(),
            duration.as_secs_f64()
        );

        Ok(ImportSummary {
            source_id: self.source_id().to_string(),
            years,
            warnings: run_warnings,
            run_id,
            duration_secs: duration.as_secs_f64(),
        })
    }

    /// Load and transform off the async runtime, retrying with a fixed delay while the
    /// file may still be locked or half-written
    pub async fn parse_with_retries(&self, path: &Path) -> Result<Vec<ParseResult>, ImportError> {
        let backoff = ConstantBuilder::default()
            .with_delay(self.retry_delay)
            .with_max_times(self.retry_count.saturating_sub(1));
        let total = self.retry_count;

        let attempt = || {
            let transformer = self.transformer.clone();
            let path = path.to_path_buf();
            async move {
                tokio::task::spawn_blocking(move || -> Result<Vec<ParseResult>, ImportError> {
                    let workbook = WorkbookLoader::new(path).load()?;
                    Ok(transformer.transform(&workbook)?)
                })
                .await?
            }
        };

        attempt
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .notify(|err: &ImportError, delay: Duration| {
                warn!(
                    "Parse attempt failed ({}), retrying in {:.1}s (max {} attempts)",
                    err,
                    delay.as_secs_f64(),
                    total
                );
            })
            .await
    }

    /// Write synthetic full years when the database has no balance data yet
    #[instrument(skip(self))]
    pub async fn seed_if_empty(&self) -> Result<bool, ImportError> {
        if !self.balance_repo.list_years().await?.is_empty() {
            debug!("Database already has balance data, not seeding");
            return Ok(false);
        }

        warn!("Empty database, generating sample balance data");
        for year in SAMPLE_YEARS {
            let result = sample_result(year, self.source_id());
            self.balance_repo.save_result(&result).await?;
            self.source_repo
                .upsert(
                    self.source_id(),
                    BALANCE_DATASET,
                    Some("sample_balance.xlsx"),
                    Utc::now(),
                )
                .await?;
            self.broker.publish(BalanceEvent::dataset_updated(
                BALANCE_DATASET,
                self.source_id(),
                Some(year),
                "Datos de ejemplo generados",
                vec![],
            ));
        }
        Ok(true)
    }
}

fn ramp(base: f64, step: f64) -> MonthlyValues {
    let mut values = [0.0; 12];
    for (idx, value) in values.iter_mut().enumerate() {
        *value = base + step * idx as f64;
    }
    values
}

/// Full-year synthetic result with steadily growing figures
pub fn sample_result(year: i32, source_id: &str) -> ParseResult {
    ParseResult {
        year,
        months: Month::ALL,
        observed_months: Month::ALL.to_vec(),
        energy: EnergySeries {
            regulados: ramp(52000.0, 500.0),
            libres: ramp(81000.0, 650.0),
            coes: ramp(9500.0, 120.0),
            servicios_aux: ramp(1500.0, 30.0),
            perdidas: ramp(2200.0, 35.0),
        },
        sales: None,
        warnings: Vec::new(),
        source_id: source_id.to_string(),
        sheet_name: "sample".to_string(),
        last_month: Some(Month::Dic),
    }
}
