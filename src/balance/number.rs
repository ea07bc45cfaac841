//! Locale-ambiguous numeric parsing ("1.234,56" vs "1,234.56").
use tracing::warn;

use crate::balance::workbook::CellValue;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NumberParseError {
    #[error("Could not parse number from '{0}'")]
    Unparseable(String),
}

/// Parse a cell into a float, falling back to 0.0 (with a log line) on garbage
pub fn parse_number(cell: &CellValue) -> f64 {
    match try_parse_number(cell) {
        Ok(value) => value,
        Err(e) => {
            warn!("{}", e);
            0.0
        }
    }
}

/// Checked variant: blanks, dashes and NaN-like text are 0.0, unreadable text is an error
pub fn try_parse_number(cell: &CellValue) -> Result<f64, NumberParseError> {
    match cell {
        CellValue::Blank => Ok(0.0),
        CellValue::Number(n) if n.is_finite() => Ok(*n),
        CellValue::Number(_) => Ok(0.0),
        CellValue::Text(s) => parse_number_text(s),
    }
}

/// True for text the report uses to mean "no value"
pub fn is_blank_marker(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || matches!(trimmed, "-" | "\u{2013}" | "\u{2014}")
        || trimmed.eq_ignore_ascii_case("nan")
}

pub fn parse_number_text(raw: &str) -> Result<f64, NumberParseError> {
    if is_blank_marker(raw) {
        return Ok(0.0);
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    let canonical = match (commas, dots) {
        // "1234,56": lone comma is the decimal point
        (1, 0) => cleaned.replace(',', "."),
        // "1.234.567": dots group thousands
        (0, d) if d > 1 => cleaned.replace('.', ""),
        // "1,234,567": commas group thousands
        (c, 0) if c > 1 => cleaned.replace(',', ""),
        // Both present: the separator that appears last is the decimal point
        (c, d) if c > 0 && d > 0 => {
            let last_comma = cleaned.rfind(',').unwrap_or(0);
            let last_dot = cleaned.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        _ => cleaned,
    };

    canonical
        .parse::<f64>()
        .map_err(|_| NumberParseError::Unparseable(raw.to_string()))
}
