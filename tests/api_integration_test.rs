// API integration tests driving the Axum router directly

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use balance_ingest_service::api::{create_router, AppState};
use balance_ingest_service::db::{BalanceRepository, EtlRunRepository, SourceRepository};
use balance_ingest_service::events::{BalanceEvent, EventBroker};
use balance_ingest_service::services::balance_import_service::sample_result;
use balance_ingest_service::services::BalanceService;
use common::test_pool;
use http_body_util::BodyExt; // For `.collect()`
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt; // For `oneshot`

const DEFAULT_SOURCE: &str = "balance-xlsx";

fn app(pool: &SqlitePool, broker: EventBroker) -> Router {
    let balance_service = BalanceService::new(
        BalanceRepository::new(pool.clone()),
        SourceRepository::new(pool.clone()),
        EtlRunRepository::new(pool.clone()),
        DEFAULT_SOURCE,
    );
    create_router(AppState {
        balance_service,
        broker,
    })
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let pool = test_pool().await;
    let (status, body) = get_json(app(&pool, EventBroker::default()), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_years_listing() {
    let pool = test_pool().await;
    let repo = BalanceRepository::new(pool.clone());
    repo.save_result(&sample_result(2025, DEFAULT_SOURCE)).await.unwrap();
    repo.save_result(&sample_result(2023, DEFAULT_SOURCE)).await.unwrap();

    let (status, body) = get_json(app(&pool, EventBroker::default()), "/api/balance/years").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"years": [2023, 2025]}));
}

#[tokio::test]
async fn test_balance_year() {
    let pool = test_pool().await;
    let mut result = sample_result(2024, DEFAULT_SOURCE);
    result.warnings = vec!["Mes 'Dic' no encontrado en la tabla. Se usa 0.".to_string()];
    BalanceRepository::new(pool.clone())
        .save_result(&result)
        .await
        .unwrap();

    let (status, body) = get_json(app(&pool, EventBroker::default()), "/api/balance/2024").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["year"], 2024);
    assert_eq!(body["source_id"], DEFAULT_SOURCE);
    assert_eq!(body["months"].as_array().unwrap().len(), 12);
    assert_eq!(body["months"][8], "Set");
    assert_eq!(body["month_count"], 12);
    assert_eq!(body["last_month"], "Dic");
    assert_eq!(body["regulados"][0], 52000.0);
    assert_eq!(body["total"][0], 52000.0 + 81000.0 + 9500.0);
    assert_eq!(body["warnings"][0], "Mes 'Dic' no encontrado en la tabla. Se usa 0.");
    assert!(body["sales"].is_null());
}

#[tokio::test]
async fn test_balance_year_source_resolution() {
    let pool = test_pool().await;
    BalanceRepository::new(pool.clone())
        .save_result(&sample_result(2021, "manual-upload"))
        .await
        .unwrap();

    let (status, body) = get_json(app(&pool, EventBroker::default()), "/api/balance/2021").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source_id"], "manual-upload");

    let (status, _) = get_json(
        app(&pool, EventBroker::default()),
        "/api/balance/2021?source_id=balance-xlsx",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_balance_year_not_found() {
    let pool = test_pool().await;
    let (status, _) = get_json(app(&pool, EventBroker::default()), "/api/balance/1999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_source_registration_round_trip() {
    let pool = test_pool().await;
    let broker = EventBroker::default();
    let mut events = broker.subscribe();

    let payload = json!({
        "source_id": "coes-portal",
        "dataset_id": "balance",
        "file_name": "BALANCE_COES.xlsx"
    });
    let response = app(&pool, broker.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sources")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"status": "registered"}));

    match events.try_recv().unwrap() {
        BalanceEvent::DatasetUpdated {
            source_id, year, ..
        } => {
            assert_eq!(source_id, "coes-portal");
            assert_eq!(year, None);
        }
        other => panic!("unexpected event {:?}", other),
    }

    let (status, body) = get_json(app(&pool, broker), "/api/sources").await;
    assert_eq!(status, StatusCode::OK);
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["source_id"], "coes-portal");
    assert_eq!(sources[0]["file_name"], "BALANCE_COES.xlsx");
}

#[tokio::test]
async fn test_source_registration_rejects_empty_ids() {
    let pool = test_pool().await;
    let response = app(&pool, EventBroker::default())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sources")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"source_id": " ", "dataset_id": "balance"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_etl_runs_listing() {
    let pool = test_pool().await;
    let runs = EtlRunRepository::new(pool.clone());
    for i in 0..3 {
        runs.record(
            DEFAULT_SOURCE,
            "balance",
            balance_ingest_service::db::EtlStatus::Success,
            &format!("Ingestado {} hojas", i),
            &[],
        )
        .await
        .unwrap();
    }

    let (status, body) = get_json(app(&pool, EventBroker::default()), "/api/etl-runs?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["runs"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["message"], "Ingestado 2 hojas");
    assert_eq!(listed[0]["status"], "SUCCESS");
}

#[tokio::test]
async fn test_events_stream_headers() {
    let pool = test_pool().await;
    let response = app(&pool, EventBroker::default())
        .oneshot(Request::builder().uri("/api/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
}
