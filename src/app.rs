use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::{cors_layer, create_router, AppState};
use crate::config::Config;
use crate::db::{BalanceRepository, EtlRunRepository, SourceRepository};
use crate::events::EventBroker;
use crate::services::{BalanceImportService, BalanceService};
use crate::workers::FileWatcher;

/// Application with the spawned server and file watcher
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
    pub watcher_handle: JoinHandle<()>,
    pub broker: EventBroker,
}

impl Application {
    /// Build and initialize the application
    ///
    /// This creates repositories and services, seeds sample data when enabled, and spawns:
    /// - HTTP API server (Axum)
    /// - Data directory watcher
    pub async fn build(config: Config, pool: SqlitePool) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let broker = EventBroker::default();

        let balance_service = BalanceService::new(
            BalanceRepository::new(pool.clone()),
            SourceRepository::new(pool.clone()),
            EtlRunRepository::new(pool.clone()),
            config.source_id.clone(),
        );
        let import_service = BalanceImportService::new(pool.clone(), broker.clone(), &config.source_id)
            .with_retry(config.xlsx_retry_count, config.retry_delay());

        if config.seed_sample_data {
            if let Err(e) = import_service.seed_if_empty().await {
                error!("Failed to seed sample data: {}", e);
            }
        }

        info!(
            "Watching {} (debounce {} ms, deadline check every {} ms)",
            config.data_dir.display(),
            config.watch_debounce_ms,
            config.watch_poll_interval_ms
        );
        let watcher = FileWatcher::new(
            config.data_dir.clone(),
            import_service,
            config.watch_poll_interval(),
            config.watch_debounce(),
        );
        let watcher_handle = tokio::spawn(watcher.run());

        let app_state = AppState {
            balance_service,
            broker: broker.clone(),
        };
        let app = create_router(app_state)
            .layer(cors_layer(&config.allowed_origins))
            .layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await
        });

        info!("Application initialized successfully");

        Ok(Self {
            server_handle,
            watcher_handle,
            broker,
        })
    }

    /// Run until the server stops; the watcher is aborted with it
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        let result = self.server_handle.await;
        self.watcher_handle.abort();
        result??;
        Ok(())
    }
}
