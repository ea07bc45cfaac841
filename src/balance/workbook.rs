//! In-memory spreadsheet model consumed by the balance transformer.
//!
//! The loader (`importers::excel_loader`) converts calamine ranges into this shape so the
//! transformer never touches a spreadsheet library directly.

/// A single cell value, reduced to the three shapes the report actually uses
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Blank,
}

impl CellValue {
    /// Blank cells, whitespace-only text and NaN numbers
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Blank => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Text rendering used for label matching (numbers are rendered without a trailing `.0`)
    pub fn to_label(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{n:.0}"),
            CellValue::Number(n) => n.to_string(),
            CellValue::Blank => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(f64::from(value))
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Blank)
    }
}

/// One worksheet: its tab title plus a row-major grid (rows may be ragged)
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub title: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(title: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            title: title.into(),
            rows,
        }
    }

    pub fn row(&self, idx: usize) -> Option<&[CellValue]> {
        self.rows.get(idx).map(|r| r.as_slice())
    }

    /// Cell lookup that treats anything outside the grid as blank
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::Blank)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Ordered collection of sheets as they appear in the source file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_detection() {
        assert!(CellValue::Blank.is_blank());
        assert!(CellValue::Text("   ".to_string()).is_blank());
        assert!(CellValue::Number(f64::NAN).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
        assert!(!CellValue::from("-").is_blank());
    }

    #[test]
    fn test_out_of_range_cell_is_blank() {
        let sheet = Sheet::new("2025", vec![vec![CellValue::from("x")]]);
        assert_eq!(sheet.cell(0, 0), &CellValue::from("x"));
        assert_eq!(sheet.cell(0, 5), &CellValue::Blank);
        assert_eq!(sheet.cell(9, 0), &CellValue::Blank);
    }

    #[test]
    fn test_number_label_rendering() {
        assert_eq!(CellValue::from(2025).to_label(), "2025");
        assert_eq!(CellValue::from(12.5).to_label(), "12.5");
        assert_eq!(CellValue::from(None::<f64>), CellValue::Blank);
    }
}
