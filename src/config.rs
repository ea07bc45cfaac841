use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::balance::DEFAULT_SOURCE_ID;

const DEFAULT_ALLOWED_ORIGINS: &str =
    "http://localhost:3000,http://127.0.0.1:3000,http://localhost:5173,http://127.0.0.1:5173";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub data_dir: PathBuf,
    pub server_host: String,
    pub server_port: u16,
    pub source_id: String,
    pub allowed_origins: Vec<String>,
    pub watch_debounce_ms: u64,
    /// How often the watcher checks debounce deadlines
    pub watch_poll_interval_ms: u64,
    pub xlsx_retry_count: usize,
    pub xlsx_retry_delay_ms: u64,
    pub seed_sample_data: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            database_url: var_or("DATABASE_URL", "sqlite://data.db?mode=rwc")?,
            data_dir: PathBuf::from(var_or("DATA_DIR", "data")?),
            server_host: var_or("SERVER_HOST", "0.0.0.0")?,
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            source_id: var_or("BALANCE_SOURCE_ID", DEFAULT_SOURCE_ID)?,
            allowed_origins: parse_origins(&var_or("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)?),
            watch_debounce_ms: env::var("WATCH_DEBOUNCE_MS")
                .unwrap_or_else(|_| "1200".to_string())
                .parse()
                .unwrap_or(1200),
            watch_poll_interval_ms: env::var("WATCH_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .unwrap_or(500),
            xlsx_retry_count: env::var("XLSX_RETRY_COUNT")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            xlsx_retry_delay_ms: env::var("XLSX_RETRY_DELAY_MS")
                .unwrap_or_else(|_| "800".to_string())
                .parse()
                .unwrap_or(800),
            seed_sample_data: env::var("SEED_SAMPLE_DATA")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn watch_debounce(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms)
    }

    pub fn watch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch_poll_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.xlsx_retry_delay_ms)
    }
}

/// Missing variables take the default; a non-unicode value is still an error
fn var_or(key: &str, default: &str) -> Result<String, env::VarError> {
    match env::var(key) {
        Ok(value) => Ok(value),
        Err(env::VarError::NotPresent) => Ok(default.to_string()),
        Err(e) => Err(e),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
