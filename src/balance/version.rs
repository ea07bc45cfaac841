//! Revision markers in sheet titles ("2018-R2 (LDS)", "2025V1", "2016 (rev3)").
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::balance::labels::normalize;

static R2_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^A-Z])R ?2(?:[^0-9]|$)").expect("valid R2 regex"));
static R1_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^A-Z])R ?1(?:[^0-9]|$)").expect("valid R1 regex"));
// The letter before V excludes the tail of "REV1"
static V1_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^A-Z])V ?1(?:[^0-9]|$)").expect("valid V1 regex"));
static REV_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"REV ?(\d+)?").expect("valid REV regex"));

/// Revision marker of a sheet, ordered from least to most authoritative.
///
/// The derived ordering is the selection ranking: `Base < Rev(n) < V1 < R1 < R2`, and
/// among REV markers the higher number wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionMarker {
    Base,
    Rev(u32),
    V1,
    R1,
    R2,
}

impl VersionMarker {
    pub fn priority(&self) -> u8 {
        match self {
            VersionMarker::Base => 0,
            VersionMarker::Rev(_) => 1,
            VersionMarker::V1 => 2,
            VersionMarker::R1 => 3,
            VersionMarker::R2 => 4,
        }
    }

    /// Secondary tiebreak; only REV markers carry a number
    pub fn revision_number(&self) -> u32 {
        match self {
            VersionMarker::Rev(n) => *n,
            _ => 0,
        }
    }

    pub fn label(&self) -> String {
        match self {
            VersionMarker::Base => "BASE".to_string(),
            VersionMarker::Rev(0) => "REV".to_string(),
            VersionMarker::Rev(n) => format!("REV{n}"),
            VersionMarker::V1 => "V1".to_string(),
            VersionMarker::R1 => "R1".to_string(),
            VersionMarker::R2 => "R2".to_string(),
        }
    }
}

impl fmt::Display for VersionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Title reduced to uppercase alphanumeric words: "2018-R2 (LDS)" → "2018 R2 LDS"
fn compact(title: &str) -> String {
    normalize(title)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn score(title: &str) -> VersionMarker {
    let compact = compact(title);

    if R2_MARKER.is_match(&compact) {
        return VersionMarker::R2;
    }
    if R1_MARKER.is_match(&compact) {
        return VersionMarker::R1;
    }
    if V1_MARKER.is_match(&compact) {
        return VersionMarker::V1;
    }

    let revisions: Vec<u32> = REV_MARKER
        .captures_iter(&compact)
        .map(|cap| {
            cap.get(1)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(0)
        })
        .collect();
    if let Some(max) = revisions.into_iter().max() {
        return VersionMarker::Rev(max);
    }

    VersionMarker::Base
}
