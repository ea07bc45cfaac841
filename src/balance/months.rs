//! Alignment of header month columns onto the canonical twelve-month axis.
use crate::balance::model::{Month, MonthlyValues};

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    /// Gap-free prefix of canonical months with real data
    pub observed_months: Vec<Month>,
    /// One twelve-month array per input series, same order
    pub series: Vec<MonthlyValues>,
    pub warnings: Vec<String>,
}

impl AlignedTable {
    pub fn last_month(&self) -> Option<Month> {
        self.observed_months.last().copied()
    }
}

/// Index of the last column carrying data in any form, if any
fn last_active_column(presence: &[bool], series: &[Vec<f64>]) -> Option<usize> {
    (0..presence.len()).rev().find(|&idx| {
        presence[idx]
            || series
                .iter()
                .any(|values| values.get(idx).is_some_and(|v| *v != 0.0))
    })
}

/// Map `series` (one value per header column in `month_columns`) onto Ene..Dic.
///
/// Columns after the last one with data are dropped from the window. Canonical months
/// missing from the window are zero-filled with a warning.
///
/// `observed_months` stops at the first month without data, but values of later months
/// inside the window are kept: after an interior gap, months past `last_month` may be
/// nonzero.
pub fn align(month_columns: &[Month], presence: &[bool], series: &[Vec<f64>]) -> AlignedTable {
    let window = match last_active_column(presence, series) {
        Some(last) => last + 1,
        None => month_columns.len(),
    };
    let active = &month_columns[..window.min(month_columns.len())];

    let mut aligned = vec![[0.0; 12]; series.len()];
    let mut aligned_presence = [false; 12];
    let mut warnings = Vec::new();

    for month in Month::ALL {
        match active.iter().position(|m| *m == month) {
            Some(col) => {
                aligned_presence[month.index()] = presence.get(col).copied().unwrap_or(false);
                for (target, values) in aligned.iter_mut().zip(series) {
                    target[month.index()] = values.get(col).copied().unwrap_or(0.0);
                }
            }
            None => warnings.push(format!("Mes '{month}' no encontrado en la tabla. Se usa 0.")),
        }
    }

    let observed_months = Month::ALL
        .iter()
        .copied()
        .take_while(|m| aligned_presence[m.index()])
        .collect();

    AlignedTable {
        observed_months,
        series: aligned,
        warnings,
    }
}
