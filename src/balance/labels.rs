//! Label canonicalization shared by every matching step.
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::balance::model::Month;
use crate::balance::workbook::CellValue;

/// Spanish month spellings seen in report headers, already in normalized (upper) form
pub const MONTH_ALIASES: &[(&str, Month)] = &[
    ("ENE", Month::Ene),
    ("ENERO", Month::Ene),
    ("FEB", Month::Feb),
    ("FEBRERO", Month::Feb),
    ("MAR", Month::Mar),
    ("MARZO", Month::Mar),
    ("ABR", Month::Abr),
    ("ABRIL", Month::Abr),
    ("MAY", Month::May),
    ("MAYO", Month::May),
    ("JUN", Month::Jun),
    ("JUNIO", Month::Jun),
    ("JUL", Month::Jul),
    ("JULIO", Month::Jul),
    ("AGO", Month::Ago),
    ("AGOSTO", Month::Ago),
    ("SET", Month::Set),
    ("SETIEMBRE", Month::Set),
    ("SEP", Month::Set),
    ("SEPT", Month::Set),
    ("SEPTIEMBRE", Month::Set),
    ("OCT", Month::Oct),
    ("OCTUBRE", Month::Oct),
    ("NOV", Month::Nov),
    ("NOVIEMBRE", Month::Nov),
    ("DIC", Month::Dic),
    ("DICIEMBRE", Month::Dic),
];

const DASH_VARIANTS: &[char] = &['\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}', '\u{2212}'];

/// Canonical form of a header cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderCell {
    Description,
    Accumulated,
    Month(Month),
    Other(String),
}

/// Uppercase, accent-free, single-spaced form of a label.
///
/// "Pérdidas  Sistemas Transmisión:" and "PERDIDAS SISTEMAS TRANSMISION" normalize to the
/// same string. En/em dashes and the minus sign become `-`.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if DASH_VARIANTS.contains(&c) { '-' } else { c })
        .collect();
    let upper = folded.to_uppercase();
    let collapsed = upper.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches(':').trim_end().to_string()
}

/// Normalize any cell; blanks become the empty string
pub fn normalize_cell(cell: &CellValue) -> String {
    match cell {
        CellValue::Blank => String::new(),
        other => normalize(&other.to_label()),
    }
}

/// Month for a header text whose leading word is a known month spelling
/// ("Enero", "ENE-25", "Set.", "Septiembre 2024").
pub fn month_from_label(normalized: &str) -> Option<Month> {
    let word: String = normalized
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    MONTH_ALIASES
        .iter()
        .find(|(alias, _)| *alias == word)
        .map(|(_, month)| *month)
}

pub fn canonicalize_header(cell: &CellValue) -> HeaderCell {
    let norm = normalize_cell(cell);
    if norm.starts_with("DESCRIPCION") {
        return HeaderCell::Description;
    }
    if norm.starts_with("ACUMULADO") {
        return HeaderCell::Accumulated;
    }
    match month_from_label(&norm) {
        Some(month) => HeaderCell::Month(month),
        None => HeaderCell::Other(norm),
    }
}

/// True when any alias is a substring of the (already normalized) label
pub fn matches_any(label: &str, aliases: &[&str]) -> bool {
    aliases.iter().any(|alias| label.contains(alias))
}
