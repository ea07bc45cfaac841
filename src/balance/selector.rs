//! One authoritative sheet per report year.
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::balance::labels::normalize;
use crate::balance::version::{score, VersionMarker};
use crate::balance::workbook::{CellValue, Sheet, Workbook};

// Matched against normalized text, so accents and case are already folded
static TITLE_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"BALANCE\s+DE\s+ENERGIA\s+EN\s+MWH\b.*?(?:^|\D)((?:19|20)\d{2})(?:\D|$)")
        .expect("valid title regex")
});

/// A sheet competing to be the source for its year
#[derive(Debug, Clone)]
pub struct SheetCandidate<'a> {
    pub year: i32,
    pub sheet_name: String,
    pub version: VersionMarker,
    /// Position of the sheet in the workbook; later sheets win exact version ties
    pub position: usize,
    pub sheet: &'a Sheet,
}

impl SheetCandidate<'_> {
    pub fn version_priority(&self) -> u8 {
        self.version.priority()
    }

    pub fn revision_number(&self) -> u32 {
        self.version.revision_number()
    }

    /// Strictly higher version wins; an equal version goes to the later sheet
    pub fn is_better_than(&self, incumbent: &SheetCandidate<'_>) -> bool {
        match self.version.cmp(&incumbent.version) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => self.position >= incumbent.position,
            std::cmp::Ordering::Less => false,
        }
    }
}

/// Year from a title cell such as "BALANCE DE ENERGÍA EN MWh - AÑO 2025"
pub fn title_year(text: &str) -> Option<i32> {
    let normalized = normalize(text);
    TITLE_YEAR
        .captures(&normalized)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

/// First year title found scanning the sheet row by row
pub fn find_title_year(sheet: &Sheet) -> Option<i32> {
    sheet
        .rows
        .iter()
        .flatten()
        .filter_map(CellValue::as_text)
        .find_map(title_year)
}

/// Row holding the title for `expected_year`, else the first title row of any year
pub fn locate_title_row(sheet: &Sheet, expected_year: i32) -> Option<usize> {
    let mut first_title: Option<usize> = None;
    for (idx, row) in sheet.rows.iter().enumerate() {
        for text in row.iter().filter_map(CellValue::as_text) {
            if let Some(year) = title_year(text) {
                if year == expected_year {
                    return Some(idx);
                }
                first_title.get_or_insert(idx);
            }
        }
    }
    first_title
}

/// Scan the workbook once and keep the best sheet for every titled year
pub fn select_candidates(workbook: &Workbook) -> BTreeMap<i32, SheetCandidate<'_>> {
    let mut selected: BTreeMap<i32, SheetCandidate<'_>> = BTreeMap::new();

    for (position, sheet) in workbook.sheets.iter().enumerate() {
        let Some(year) = find_title_year(sheet) else {
            info!("Skipping sheet '{}': no balance title with a year", sheet.title);
            continue;
        };

        let candidate = SheetCandidate {
            year,
            sheet_name: sheet.title.clone(),
            version: score(&sheet.title),
            position,
            sheet,
        };

        match selected.get(&year) {
            Some(incumbent) if !candidate.is_better_than(incumbent) => {
                info!(
                    "Discarding sheet '{}' for year {} ('{}' has version {} >= {})",
                    candidate.sheet_name,
                    year,
                    incumbent.sheet_name,
                    incumbent.version,
                    candidate.version
                );
            }
            previous => {
                if let Some(incumbent) = previous {
                    debug!(
                        "Sheet '{}' replaces '{}' for year {}",
                        candidate.sheet_name, incumbent.sheet_name, year
                    );
                }
                info!(
                    "Selecting sheet '{}' for year {} (version {})",
                    candidate.sheet_name, year, candidate.version
                );
                selected.insert(year, candidate);
            }
        }
    }

    selected
}
