use balance_ingest_service::balance::{BalanceTransformer, ParseResult, DEFAULT_SOURCE_ID};
use balance_ingest_service::importers::WorkbookLoader;
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "verify-balance")]
#[command(about = "Parse an energy balance workbook and report what was extracted per year", long_about = None)]
struct Cli {
    /// Path to the balance workbook (.xlsx)
    excel_path: PathBuf,

    /// First year expected in the workbook
    #[arg(long, default_value = "2016")]
    from: i32,

    /// Last year expected in the workbook
    #[arg(long, default_value = "2025")]
    to: i32,

    /// Print the parsed results as JSON on stdout
    #[arg(long)]
    json: bool,
}

const MWH_PER_GWH: f64 = 1000.0;

fn gwh(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / MWH_PER_GWH
}

fn report(result: &ParseResult) {
    let energy = &result.energy;
    info!(
        "{} [{}]: {} months (last {}), regulados {:.2} GWh, libres {:.2} GWh, coes {:.2} GWh, servicios aux {:.2} GWh, perdidas {:.2} GWh",
        result.year,
        result.sheet_name,
        result.observed_months.len(),
        result
            .last_month
            .map(|m| m.code().to_string())
            .unwrap_or_else(|| "-".to_string()),
        gwh(&energy.regulados),
        gwh(&energy.libres),
        gwh(&energy.coes),
        gwh(&energy.servicios_aux),
        gwh(&energy.perdidas),
    );
    if result.sales.is_some() {
        info!("{}: sales table present", result.year);
    }
    for warning in &result.warnings {
        warn!("{}: {}", result.year, warning);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    if !cli.excel_path.exists() {
        error!("File not found: {}", cli.excel_path.display());
        std::process::exit(1);
    }

    let workbook = WorkbookLoader::new(&cli.excel_path).load()?;
    let results = BalanceTransformer::new(DEFAULT_SOURCE_ID).transform(&workbook)?;

    for result in &results {
        report(result);
    }

    let found: BTreeSet<i32> = results.iter().map(|r| r.year).collect();
    let missing: Vec<i32> = (cli.from..=cli.to)
        .filter(|year| !found.contains(year))
        .collect();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    if !missing.is_empty() {
        error!("Missing years: {:?}", missing);
        std::process::exit(1);
    }

    info!("All years {}-{} present ({} parsed)", cli.from, cli.to, results.len());
    Ok(())
}
