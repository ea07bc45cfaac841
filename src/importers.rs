//! Workbook loading from disk

pub mod excel_loader;

pub use excel_loader::{LoadError, WorkbookLoader};
