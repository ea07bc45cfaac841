use thiserror::Error;

/// Structural failures of the balance transformer.
///
/// Only `NoBalanceTitle` is fatal to a whole run; the others are scoped to one sheet or
/// one header row and are logged by the caller before moving on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BalanceError {
    #[error("No sheet contains a 'BALANCE DE ENERGÍA EN MWh - AÑO YYYY' title")]
    NoBalanceTitle,

    #[error("No header row with 'DESCRIPCIÓN' and month columns in sheet {sheet}")]
    NoHeaderRow { sheet: String },

    #[error("Header at row {row} has no month columns")]
    NoMonthColumns { row: usize },

    #[error("No energy table for year {year} in sheet {sheet}")]
    NoEnergyTable { year: i32, sheet: String },
}
