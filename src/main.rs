use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use balance_ingest_service::app::Application;
use balance_ingest_service::config::Config;
use balance_ingest_service::db::pool;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with environment filter support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,balance_ingest_service=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    info!("Starting balance ingest service with config: {:?}", config);

    info!("Connecting to database...");
    let pool = pool::connect(&config.database_url, 5).await?;

    let app = Application::build(config, pool).await?;
    app.run_until_stopped().await
}
