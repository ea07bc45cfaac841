//! Header discovery and energy/monetary classification.
use crate::balance::labels::{canonicalize_header, normalize_cell, HeaderCell};
use crate::balance::model::Month;
use crate::balance::workbook::Sheet;

/// Minimum month columns for a row to count as a table header
pub const MIN_MONTH_COLUMNS: usize = 3;

/// Rows above a header inspected for currency hints
pub const CONTEXT_ROWS: usize = 3;

const MONETARY_HINTS: &[&str] = &["MILLONES", "SOLES", "S/", "MONETARI"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Energy,
    Monetary,
}

impl TableKind {
    pub fn label(&self) -> &'static str {
        match self {
            TableKind::Energy => "energy",
            TableKind::Monetary => "monetary",
        }
    }
}

/// A qualifying header row and the columns it maps
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRow {
    pub row: usize,
    pub description_col: usize,
    /// (column index, month) in sheet order
    pub month_columns: Vec<(usize, Month)>,
}

impl HeaderRow {
    pub fn months(&self) -> Vec<Month> {
        self.month_columns.iter().map(|(_, m)| *m).collect()
    }
}

/// Parse one row as a header; `None` unless it has DESCRIPCIÓN and enough months
pub fn parse_header(row_idx: usize, sheet: &Sheet) -> Option<HeaderRow> {
    let cells = sheet.row(row_idx)?;
    let canonical: Vec<HeaderCell> = cells.iter().map(canonicalize_header).collect();

    let description_col = canonical
        .iter()
        .position(|c| *c == HeaderCell::Description)?;
    let month_columns: Vec<(usize, Month)> = canonical
        .iter()
        .enumerate()
        .filter_map(|(col, c)| match c {
            HeaderCell::Month(m) => Some((col, *m)),
            _ => None,
        })
        .collect();

    if month_columns.len() < MIN_MONTH_COLUMNS {
        return None;
    }

    Some(HeaderRow {
        row: row_idx,
        description_col,
        month_columns,
    })
}

pub fn find_header_rows(sheet: &Sheet) -> Vec<HeaderRow> {
    (0..sheet.height())
        .filter_map(|idx| parse_header(idx, sheet))
        .collect()
}

/// Monetary when the rows just above the header mention a currency
pub fn classify_table(sheet: &Sheet, header_row: usize) -> TableKind {
    let start = header_row.saturating_sub(CONTEXT_ROWS);
    let context = (start..header_row)
        .filter_map(|idx| sheet.row(idx))
        .flatten()
        .map(normalize_cell)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if MONETARY_HINTS.iter().any(|hint| context.contains(hint)) {
        TableKind::Monetary
    } else {
        TableKind::Energy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::workbook::CellValue;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells
            .iter()
            .map(|s| {
                if s.is_empty() {
                    CellValue::Blank
                } else {
                    CellValue::from(*s)
                }
            })
            .collect()
    }

    #[test]
    fn test_header_requires_description_and_three_months() {
        let sheet = Sheet::new(
            "s",
            vec![
                row(&["DESCRIPCIÓN", "Ene", "Feb"]),
                row(&["Concepto", "Ene", "Feb", "Mar"]),
                row(&["", "DESCRIPCIÓN", "Enero", "Febrero", "Marzo", "Acumulado"]),
            ],
        );
        let headers = find_header_rows(&sheet);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].row, 2);
        assert_eq!(headers[0].description_col, 1);
        assert_eq!(
            headers[0].month_columns,
            vec![(2, Month::Ene), (3, Month::Feb), (4, Month::Mar)]
        );
    }

    #[test]
    fn test_classify_monetary_context() {
        let sheet = Sheet::new(
            "s",
            vec![
                row(&["VENTAS EN MILLONES DE S/"]),
                row(&[]),
                row(&["DESCRIPCIÓN", "Ene", "Feb", "Mar"]),
                row(&["Regulados", "1", "2", "3"]),
                row(&[]),
                row(&["Energía en MWh"]),
                row(&["DESCRIPCIÓN", "Ene", "Feb", "Mar"]),
            ],
        );
        assert_eq!(classify_table(&sheet, 2), TableKind::Monetary);
        assert_eq!(classify_table(&sheet, 6), TableKind::Energy);
    }

    #[test]
    fn test_classify_only_looks_three_rows_up() {
        let sheet = Sheet::new(
            "s",
            vec![
                row(&["Importes monetarios"]),
                row(&[]),
                row(&[]),
                row(&[]),
                row(&["DESCRIPCIÓN", "Ene", "Feb", "Mar"]),
            ],
        );
        assert_eq!(classify_table(&sheet, 4), TableKind::Energy);
        assert_eq!(classify_table(&sheet, 0), TableKind::Energy);
    }
}
