use balance_ingest_service::db::pool;
use balance_ingest_service::events::EventBroker;
use balance_ingest_service::services::BalanceImportService;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "import-balance")]
#[command(about = "Import one energy balance workbook into the database", long_about = None)]
struct Cli {
    /// Path to the balance workbook (.xlsx)
    excel_path: PathBuf,

    /// Database connection string
    #[arg(long, env, default_value = "sqlite://data.db?mode=rwc")]
    database_url: String,

    /// Source id the imported years are stored under
    #[arg(long, env = "BALANCE_SOURCE_ID", default_value = "balance-xlsx")]
    source_id: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,balance_ingest_service=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();

    let pool = pool::connect(&cli.database_url, 1).await?;
    let service = BalanceImportService::new(pool, EventBroker::default(), &cli.source_id);

    let summary = service.process_file(&cli.excel_path).await?;

    info!(
        "Imported years {:?} from {} in {:.2}s (run {}, {} warnings)",
        summary.years,
        cli.excel_path.display(),
        summary.duration_secs,
        summary.run_id,
        summary.warnings.len()
    );
    for warning in &summary.warnings {
        info!("  {}", warning);
    }

    Ok(())
}
