// Repository tests against an in-memory SQLite database

mod common;

use balance_ingest_service::balance::{Month, ParseResult, SalesSeries};
use balance_ingest_service::db::{
    BalanceRepository, EtlRunRepository, EtlStatus, SourceRepository,
};
use balance_ingest_service::services::balance_import_service::sample_result;
use chrono::Utc;
use common::test_pool;

fn partial_result(year: i32, source_id: &str) -> ParseResult {
    let mut result = sample_result(year, source_id);
    result.observed_months = vec![Month::Ene, Month::Feb];
    result.last_month = Some(Month::Feb);
    result.sheet_name = format!("{} REV2", year);
    result.warnings = vec!["No se encontró fila para 'Pérdidas'".to_string()];
    for series in [
        &mut result.energy.regulados,
        &mut result.energy.libres,
        &mut result.energy.coes,
        &mut result.energy.servicios_aux,
        &mut result.energy.perdidas,
    ] {
        for value in series[2..].iter_mut() {
            *value = 0.0;
        }
    }
    result
}

#[tokio::test]
async fn test_save_and_fetch_year() {
    let pool = test_pool().await;
    let repo = BalanceRepository::new(pool);

    let result = partial_result(2025, "balance-xlsx");
    repo.save_result(&result).await.unwrap();

    let view = repo.fetch_year(2025, "balance-xlsx").await.unwrap().unwrap();
    assert_eq!(view.year, 2025);
    assert_eq!(view.months, Month::ALL);
    assert_eq!(view.observed_months, vec![Month::Ene, Month::Feb]);
    assert_eq!(view.month_count, 2);
    assert_eq!(view.last_month, Some(Month::Feb));
    assert_eq!(view.sheet_name.as_deref(), Some("2025 REV2"));
    assert_eq!(view.warnings, result.warnings);
    assert_eq!(view.regulados, result.energy.regulados);
    assert_eq!(view.perdidas, result.energy.perdidas);
    assert_eq!(view.total[0], result.total_for(Month::Ene));
    assert_eq!(view.total[5], 0.0);
    assert!(view.sales.is_none());
    assert!(view.updated_at.is_some());
}

#[tokio::test]
async fn test_save_is_an_upsert() {
    let pool = test_pool().await;
    let repo = BalanceRepository::new(pool.clone());

    repo.save_result(&partial_result(2024, "s")).await.unwrap();
    repo.save_result(&sample_result(2024, "s")).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM balance_monthly WHERE year = 2024")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 12);

    let view = repo.fetch_year(2024, "s").await.unwrap().unwrap();
    assert_eq!(view.month_count, 12);
    assert_eq!(view.last_month, Some(Month::Dic));
    assert!(view.warnings.is_empty());
}

#[tokio::test]
async fn test_sales_are_stored_and_replaced() {
    let pool = test_pool().await;
    let repo = BalanceRepository::new(pool);

    let mut result = sample_result(2023, "s");
    let mut regulados = [0.0; 12];
    regulados[0] = 12.5;
    result.sales = Some(SalesSeries {
        regulados,
        libres: [1.0; 12],
        coes_spot: [0.0; 12],
        otros: [0.25; 12],
    });
    repo.save_result(&result).await.unwrap();

    let sales = repo.fetch_year(2023, "s").await.unwrap().unwrap().sales.unwrap();
    assert_eq!(sales.regulados[0], 12.5);
    assert_eq!(sales.otros[11], 0.25);

    result.sales = None;
    repo.save_result(&result).await.unwrap();
    assert!(repo.fetch_year(2023, "s").await.unwrap().unwrap().sales.is_none());
}

#[tokio::test]
async fn test_missing_metadata_falls_back_to_full_year() {
    let pool = test_pool().await;
    let repo = BalanceRepository::new(pool.clone());

    repo.save_result(&partial_result(2022, "s")).await.unwrap();
    sqlx::query("DELETE FROM balance_metadata")
        .execute(&pool)
        .await
        .unwrap();

    let view = repo.fetch_year(2022, "s").await.unwrap().unwrap();
    assert_eq!(view.observed_months, Month::ALL.to_vec());
    assert_eq!(view.last_month, Some(Month::Dic));
    assert!(view.sheet_name.is_none());
}

#[tokio::test]
async fn test_list_years_and_sources() {
    let pool = test_pool().await;
    let repo = BalanceRepository::new(pool);

    assert!(repo.list_years().await.unwrap().is_empty());
    assert!(repo.fetch_year(2020, "s").await.unwrap().is_none());

    repo.save_result(&sample_result(2025, "b")).await.unwrap();
    repo.save_result(&sample_result(2023, "a")).await.unwrap();
    repo.save_result(&sample_result(2025, "a")).await.unwrap();

    assert_eq!(repo.list_years().await.unwrap(), vec![2023, 2025]);
    assert_eq!(repo.sources_for_year(2025).await.unwrap(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_source_upsert() {
    let pool = test_pool().await;
    let repo = SourceRepository::new(pool);

    repo.upsert("balance-xlsx", "balance", None, Utc::now())
        .await
        .unwrap();
    repo.upsert("balance-xlsx", "balance", Some("BALANCE_2025.xlsx"), Utc::now())
        .await
        .unwrap();
    repo.upsert("other", "balance", None, Utc::now()).await.unwrap();

    let sources = repo.list().await.unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].source_id, "balance-xlsx");
    assert_eq!(sources[0].file_name.as_deref(), Some("BALANCE_2025.xlsx"));
    assert!(sources[0].enabled);

    assert!(repo.find_by_id("other").await.unwrap().is_some());
    assert!(repo.find_by_id("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_etl_runs_newest_first() {
    let pool = test_pool().await;
    let repo = EtlRunRepository::new(pool);

    let first = repo
        .record("s", "balance", EtlStatus::Success, "Ingestado 2 hojas", &[])
        .await
        .unwrap();
    let second = repo
        .record(
            "s",
            "balance",
            EtlStatus::Error,
            "Error procesando x.xlsx",
            &["Error procesando x.xlsx".to_string()],
        )
        .await
        .unwrap();
    assert!(second > first);

    let runs = repo.recent(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].id, second);
    assert_eq!(runs[0].status, EtlStatus::Error);
    assert_eq!(runs[0].warnings, vec!["Error procesando x.xlsx"]);
    assert_eq!(runs[1].status, EtlStatus::Success);

    assert_eq!(repo.recent(1).await.unwrap().len(), 1);
}
