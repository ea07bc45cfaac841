use calamine::{open_workbook, Data, Reader, Xlsx};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::balance::{CellValue, Sheet, Workbook};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Workbook not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to open workbook {path}: {msg}")]
    WorkbookOpen { path: PathBuf, msg: String },

    #[error("Failed to read sheet {sheet}: {msg}")]
    SheetRead { sheet: String, msg: String },
}

/// Reads an `.xlsx`/`.xlsm` balance report into the in-memory [`Workbook`]
pub struct WorkbookLoader {
    path: PathBuf,
}

impl WorkbookLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every worksheet in workbook order.
    ///
    /// This is synchronous, callers in async code should use `spawn_blocking`. Cell
    /// coordinates match the sheet: rows and columns before the used range are padded
    /// with blanks.
    pub fn load(&self) -> Result<Workbook, LoadError> {
        if !self.path.exists() {
            return Err(LoadError::NotFound(self.path.clone()));
        }

        let mut workbook: Xlsx<BufReader<File>> =
            open_workbook(&self.path).map_err(|e: calamine::XlsxError| LoadError::WorkbookOpen {
                path: self.path.clone(),
                msg: e.to_string(),
            })?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| LoadError::SheetRead {
                    sheet: name.clone(),
                    msg: e.to_string(),
                })?;

            let (row_offset, col_offset) = range
                .start()
                .map(|(r, c)| (r as usize, c as usize))
                .unwrap_or((0, 0));

            let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
            for data_row in range.rows() {
                let mut cells = vec![CellValue::Blank; col_offset];
                cells.extend(data_row.iter().map(cell_from_data));
                rows.push(cells);
            }

            debug!("Loaded sheet '{}' with {} rows", name, rows.len());
            sheets.push(Sheet::new(name, rows));
        }

        info!(
            "Loaded {} sheets from {}",
            sheets.len(),
            self.path.display()
        );
        Ok(Workbook::new(sheets))
    }
}

/// Map a calamine cell onto the closed cell union
pub fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::String(s) if s.trim().is_empty() => CellValue::Blank,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Blank,
    }
}
