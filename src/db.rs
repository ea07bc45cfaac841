pub mod balance_repository;
pub mod error;
pub mod etl_run_repository;
pub mod models;
pub mod pool;
pub mod source_repository;

pub use balance_repository::BalanceRepository;
pub use error::DbError;
pub use etl_run_repository::EtlRunRepository;
pub use models::*;
pub use source_repository::SourceRepository;
