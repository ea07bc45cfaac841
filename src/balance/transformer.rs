use tracing::{error, info, instrument, warn};

use crate::balance::error::BalanceError;
use crate::balance::metrics::{EnergyMetric, SalesMetric};
use crate::balance::model::{EnergySeries, MonthlyValues, Month, ParseResult, SalesSeries};
use crate::balance::months::{align, AlignedTable};
use crate::balance::rows::{match_energy_rows, match_sales_rows, read_table};
use crate::balance::selector::{locate_title_row, select_candidates, SheetCandidate};
use crate::balance::table::{classify_table, find_header_rows, HeaderRow, TableKind};
use crate::balance::workbook::{Sheet, Workbook};

pub const DEFAULT_SOURCE_ID: &str = "balance-xlsx";

/// Turns a loaded workbook into one [`ParseResult`] per report year.
///
/// Stateless apart from the source id stamped on every result, so one instance can be
/// shared across imports.
#[derive(Debug, Clone)]
pub struct BalanceTransformer {
    source_id: String,
}

impl Default for BalanceTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_ID)
    }
}

impl BalanceTransformer {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Parse every titled year in the workbook, ascending by year.
    ///
    /// Fails only when no sheet carries a balance title. A year whose sheet cannot be
    /// parsed is logged and left out.
    #[instrument(skip(self, workbook), fields(source_id = %self.source_id, sheets = workbook.sheets.len()))]
    pub fn transform(&self, workbook: &Workbook) -> Result<Vec<ParseResult>, BalanceError> {
        let candidates = select_candidates(workbook);
        if candidates.is_empty() {
            return Err(BalanceError::NoBalanceTitle);
        }

        let mut results = Vec::with_capacity(candidates.len());
        for (year, candidate) in &candidates {
            match self.parse_sheet(candidate) {
                Ok(result) => {
                    info!(
                        "Parsed year {} from sheet '{}': {} observed months, {} warnings",
                        year,
                        candidate.sheet_name,
                        result.observed_months.len(),
                        result.warnings.len()
                    );
                    results.push(result);
                }
                Err(e) => {
                    error!("Skipping year {} (sheet '{}'): {}", year, candidate.sheet_name, e);
                }
            }
        }

        results.sort_by_key(|r| r.year);
        Ok(results)
    }

    /// Build the result for one selected sheet
    pub fn parse_sheet(&self, candidate: &SheetCandidate<'_>) -> Result<ParseResult, BalanceError> {
        let sheet = candidate.sheet;
        let headers = headers_after_title(sheet, candidate.year);
        if headers.is_empty() {
            return Err(BalanceError::NoHeaderRow {
                sheet: candidate.sheet_name.clone(),
            });
        }

        let mut energy: Option<(EnergySeries, Vec<Month>)> = None;
        let mut sales: Option<SalesSeries> = None;
        let mut warnings = Vec::new();

        for header in &headers {
            let kind = classify_table(sheet, header.row);
            let taken = match kind {
                TableKind::Energy => energy.is_some(),
                TableKind::Monetary => sales.is_some(),
            };
            if taken {
                info!(
                    "Duplicate {} table at row {} in '{}', skipping",
                    kind.label(),
                    header.row + 1,
                    candidate.sheet_name
                );
                continue;
            }

            let table = match extract_table(sheet, header, kind) {
                Ok(table) => table,
                Err(e) => {
                    warn!(
                        "Could not parse table at row {} of '{}': {}",
                        header.row + 1,
                        candidate.sheet_name,
                        e
                    );
                    continue;
                }
            };

            match kind {
                TableKind::Energy => {
                    energy = Some((energy_series(&table.series), table.observed_months));
                }
                TableKind::Monetary => sales = Some(sales_series(&table.series)),
            }
            warnings.extend(table.warnings);
        }

        let Some((energy, observed_months)) = energy else {
            return Err(BalanceError::NoEnergyTable {
                year: candidate.year,
                sheet: candidate.sheet_name.clone(),
            });
        };

        warnings.extend(missing_rows_report(&energy));
        let last_month = observed_months.last().copied();

        Ok(ParseResult {
            year: candidate.year,
            months: Month::ALL,
            observed_months,
            energy,
            sales,
            warnings,
            source_id: self.source_id.clone(),
            sheet_name: candidate.sheet_name.clone(),
            last_month,
        })
    }
}

/// Header rows below the sheet's title, or all of them when none lie below it
fn headers_after_title(sheet: &Sheet, year: i32) -> Vec<HeaderRow> {
    let headers = find_header_rows(sheet);
    let Some(title_row) = locate_title_row(sheet, year) else {
        return headers;
    };
    let below: Vec<HeaderRow> = headers
        .iter()
        .filter(|h| h.row > title_row)
        .cloned()
        .collect();
    if below.is_empty() {
        headers
    } else {
        below
    }
}

/// Read, match and align the table under one header
pub fn extract_table(
    sheet: &Sheet,
    header: &HeaderRow,
    kind: TableKind,
) -> Result<AlignedTable, BalanceError> {
    if header.month_columns.is_empty() {
        return Err(BalanceError::NoMonthColumns { row: header.row });
    }

    let width = header.month_columns.len();
    let table = read_table(sheet, header);
    let matched = match kind {
        TableKind::Energy => match_energy_rows(&table.rows, width),
        TableKind::Monetary => match_sales_rows(&table.rows, width),
    };

    let mut aligned = align(&header.months(), &table.presence, &matched.series);
    let mut warnings = table.warnings;
    warnings.extend(matched.warnings);
    warnings.append(&mut aligned.warnings);
    aligned.warnings = warnings;

    if !aligned.warnings.is_empty() {
        warn!(
            "{} table at row {} of '{}' produced {} warnings",
            kind.label(),
            header.row + 1,
            sheet.title,
            aligned.warnings.len()
        );
    }

    Ok(aligned)
}

fn series_at(series: &[MonthlyValues], idx: usize) -> MonthlyValues {
    series.get(idx).copied().unwrap_or([0.0; 12])
}

fn energy_series(series: &[MonthlyValues]) -> EnergySeries {
    EnergySeries {
        regulados: series_at(series, EnergyMetric::Regulados.index()),
        libres: series_at(series, EnergyMetric::Libres.index()),
        coes: series_at(series, EnergyMetric::Coes.index()),
        servicios_aux: series_at(series, EnergyMetric::ServiciosAux.index()),
        perdidas: series_at(series, EnergyMetric::Perdidas.index()),
    }
}

fn sales_series(series: &[MonthlyValues]) -> SalesSeries {
    SalesSeries {
        regulados: series_at(series, SalesMetric::Regulados.index()),
        libres: series_at(series, SalesMetric::Libres.index()),
        coes_spot: series_at(series, SalesMetric::CoesSpot.index()),
        otros: series_at(series, SalesMetric::Otros.index()),
    }
}

/// One warning per energy metric left entirely at zero, named as in the report
pub fn missing_rows_report(energy: &EnergySeries) -> Vec<String> {
    [
        (EnergyMetric::Regulados, &energy.regulados),
        (EnergyMetric::Libres, &energy.libres),
        (EnergyMetric::Coes, &energy.coes),
        (EnergyMetric::Perdidas, &energy.perdidas),
        (EnergyMetric::ServiciosAux, &energy.servicios_aux),
    ]
    .iter()
    .filter(|(_, values)| values.iter().all(|v| *v == 0.0))
    .map(|(metric, _)| format!("No se encontró fila para '{}'", metric.report_label()))
    .collect()
}
