use chrono::Utc;
use tracing::debug;

use crate::db::{
    BalanceRepository, BalanceYearView, DbError, EtlRun, EtlRunRepository, Source,
    SourceRepository,
};

/// Read side of the balance data, plus source registration
#[derive(Clone)]
pub struct BalanceService {
    balance_repo: BalanceRepository,
    source_repo: SourceRepository,
    run_repo: EtlRunRepository,
    default_source_id: String,
}

impl BalanceService {
    pub fn new(
        balance_repo: BalanceRepository,
        source_repo: SourceRepository,
        run_repo: EtlRunRepository,
        default_source_id: impl Into<String>,
    ) -> Self {
        Self {
            balance_repo,
            source_repo,
            run_repo,
            default_source_id: default_source_id.into(),
        }
    }

    pub async fn list_years(&self) -> Result<Vec<i32>, DbError> {
        self.balance_repo.list_years().await
    }

    /// One stored year.
    ///
    /// Without an explicit source the configured default wins, then the first source
    /// (alphabetically) that holds the year.
    pub async fn get_year(
        &self,
        year: i32,
        source_id: Option<&str>,
    ) -> Result<Option<BalanceYearView>, DbError> {
        if let Some(source_id) = source_id {
            return self.balance_repo.fetch_year(year, source_id).await;
        }

        if let Some(view) = self
            .balance_repo
            .fetch_year(year, &self.default_source_id)
            .await?
        {
            return Ok(Some(view));
        }

        match self.balance_repo.sources_for_year(year).await?.first() {
            Some(source_id) => {
                debug!("Year {} not in default source, using {}", year, source_id);
                self.balance_repo.fetch_year(year, source_id).await
            }
            None => Ok(None),
        }
    }

    pub async fn list_sources(&self) -> Result<Vec<Source>, DbError> {
        self.source_repo.list().await
    }

    pub async fn register_source(
        &self,
        source_id: &str,
        dataset_id: &str,
        file_name: Option<&str>,
    ) -> Result<(), DbError> {
        self.source_repo
            .upsert(source_id, dataset_id, file_name, Utc::now())
            .await
    }

    pub async fn recent_runs(&self, limit: i64) -> Result<Vec<EtlRun>, DbError> {
        self.run_repo.recent(limit).await
    }
}
