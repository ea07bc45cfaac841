// Import service tests: ETL run bookkeeping and event publishing

mod common;

use balance_ingest_service::balance::{BalanceError, Month};
use balance_ingest_service::db::{BalanceRepository, EtlRunRepository, EtlStatus, SourceRepository};
use balance_ingest_service::events::{BalanceEvent, EventBroker};
use balance_ingest_service::services::balance_import_service::SAMPLE_YEARS;
use balance_ingest_service::services::{BalanceImportService, ImportError};
use common::test_pool;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

fn sample_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("sample-data-files")
        .join(name)
}

#[tokio::test]
async fn test_missing_file_records_warning_without_events() {
    let pool = test_pool().await;
    let broker = EventBroker::default();
    let mut events = broker.subscribe();
    let service = BalanceImportService::new(pool.clone(), broker, "balance-xlsx");

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("BALANCE_2025.xlsx");
    let err = service.process_file(&missing).await.unwrap_err();
    assert!(matches!(err, ImportError::FileNotFound(_)));

    let runs = EtlRunRepository::new(pool).recent(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, EtlStatus::Warning);
    assert!(runs[0].message.contains("no encontrado"));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_unreadable_workbook_records_error_and_publishes() {
    let pool = test_pool().await;
    let broker = EventBroker::default();
    let mut events = broker.subscribe();
    let service = BalanceImportService::new(pool.clone(), broker, "balance-xlsx")
        .with_retry(2, Duration::from_millis(1));

    let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    file.write_all(b"definitely not a zip archive").unwrap();

    let err = service.process_file(file.path()).await.unwrap_err();
    assert!(matches!(err, ImportError::Load(_)));

    let runs = EtlRunRepository::new(pool.clone()).recent(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, EtlStatus::Error);
    assert_eq!(runs[0].warnings.len(), 1);

    match events.try_recv().unwrap() {
        BalanceEvent::EtlError {
            source_id,
            dataset_id,
            warnings,
            ..
        } => {
            assert_eq!(source_id, "balance-xlsx");
            assert_eq!(dataset_id, "balance");
            assert_eq!(warnings.len(), 1);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(BalanceRepository::new(pool).list_years().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_seed_only_fills_an_empty_database() {
    let pool = test_pool().await;
    let broker = EventBroker::default();
    let mut events = broker.subscribe();
    let service = BalanceImportService::new(pool.clone(), broker, "seeded");

    assert!(service.seed_if_empty().await.unwrap());
    assert!(!service.seed_if_empty().await.unwrap());

    let repo = BalanceRepository::new(pool);
    assert_eq!(repo.list_years().await.unwrap(), SAMPLE_YEARS.to_vec());
    let view = repo.fetch_year(2024, "seeded").await.unwrap().unwrap();
    assert_eq!(view.month_count, 12);

    let mut seeded_years = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let BalanceEvent::DatasetUpdated { year, .. } = event {
            seeded_years.extend(year);
        }
    }
    assert_eq!(seeded_years, SAMPLE_YEARS.to_vec());
}

#[tokio::test]
async fn test_parse_with_retries_gives_up_on_missing_file() {
    let pool = test_pool().await;
    let service = BalanceImportService::new(pool, EventBroker::default(), "s")
        .with_retry(3, Duration::from_millis(1));

    let err = service
        .parse_with_retries(std::path::Path::new("/nonexistent/balance.xlsx"))
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Load(_)));
}

#[tokio::test]
async fn test_process_sample_workbook() {
    let pool = test_pool().await;
    let broker = EventBroker::default();
    let mut events = broker.subscribe();
    let service = BalanceImportService::new(pool.clone(), broker, "balance-xlsx");

    let summary = service
        .process_file(&sample_file("balance_sample.xlsx"))
        .await
        .unwrap();
    assert_eq!(summary.source_id, "balance-xlsx");
    assert_eq!(summary.years, vec![2024, 2025]);
    assert!(summary.warnings.is_empty());

    let monthly: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM balance_monthly")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(monthly, 24);
    let metadata: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM balance_metadata")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(metadata, 2);

    let runs = EtlRunRepository::new(pool.clone()).recent(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, EtlStatus::Success);
    assert_eq!(runs[0].message, "Ingestado 2 hojas");
    assert_eq!(runs[0].id, summary.run_id);

    let mut updated_years = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            BalanceEvent::DatasetUpdated {
                year, source_id, ..
            } => {
                assert_eq!(source_id, "balance-xlsx");
                updated_years.extend(year);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!(updated_years, vec![2024, 2025]);

    let source = SourceRepository::new(pool.clone())
        .find_by_id("balance-xlsx")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(source.file_name.as_deref(), Some("balance_sample.xlsx"));
    assert!(source.last_ingested.is_some());

    let repo = BalanceRepository::new(pool);
    assert_eq!(repo.list_years().await.unwrap(), vec![2024, 2025]);
    let view = repo.fetch_year(2025, "balance-xlsx").await.unwrap().unwrap();
    assert_eq!(view.observed_months, vec![Month::Ene, Month::Feb]);
    assert_eq!(view.last_month, Some(Month::Feb));
    assert_eq!(view.sheet_name.as_deref(), Some("2025 R1"));
    assert_eq!(view.regulados[0], 2000.0);
    assert_eq!(view.total[0], 2000.0 + 800.0 + 300.0);
}

#[tokio::test]
async fn test_workbook_without_balance_title_records_error() {
    let pool = test_pool().await;
    let broker = EventBroker::default();
    let mut events = broker.subscribe();
    let service = BalanceImportService::new(pool.clone(), broker, "balance-xlsx")
        .with_retry(1, Duration::from_millis(1));

    let err = service
        .process_file(&sample_file("balance_without_titles.xlsx"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ImportError::Balance(BalanceError::NoBalanceTitle)
    ));

    let runs = EtlRunRepository::new(pool.clone()).recent(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, EtlStatus::Error);
    assert!(runs[0].message.contains("balance_without_titles.xlsx"));

    assert!(matches!(
        events.try_recv().unwrap(),
        BalanceEvent::EtlError { .. }
    ));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert!(BalanceRepository::new(pool).list_years().await.unwrap().is_empty());
}
