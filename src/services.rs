pub mod balance_import_service;
pub mod balance_service;

pub use balance_import_service::{BalanceImportService, ImportError, ImportSummary};
pub use balance_service::BalanceService;
