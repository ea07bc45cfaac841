//! Row matching: reads a table body and resolves every target metric to one row.
use tracing::{debug, warn};

use crate::balance::labels::{matches_any, normalize_cell};
use crate::balance::metrics::{
    EnergyMetric, SalesMetric, PERDIDAS_ENERGY, PURCHASE_BANNERS, SALE_BANNERS,
    SERVICIOS_AUX_FALLBACK, SERVICIOS_AUX_PREFERRED,
};
use crate::balance::number::try_parse_number;
use crate::balance::table::{parse_header, HeaderRow};
use crate::balance::workbook::{CellValue, Sheet};

/// One body row: normalized description plus one value per header month column
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    pub sheet_row: usize,
    pub label: String,
    pub values: Vec<f64>,
}

/// Table body as read below a header
#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub rows: Vec<DataRow>,
    /// Per month column: some cell held a real nonzero number
    pub presence: Vec<bool>,
    pub warnings: Vec<String>,
}

/// Series per metric (header-column order, not yet aligned) plus matching warnings
#[derive(Debug, Clone, Default)]
pub struct MatchedSeries {
    pub series: Vec<Vec<f64>>,
    pub warnings: Vec<String>,
}

/// Read rows under `header` until the first fully blank row or the next header
pub fn read_table(sheet: &Sheet, header: &HeaderRow) -> TableData {
    let width = header.month_columns.len();
    let mut table = TableData {
        rows: Vec::new(),
        presence: vec![false; width],
        warnings: Vec::new(),
    };

    for ridx in (header.row + 1)..sheet.height() {
        let cells = sheet.row(ridx).unwrap_or(&[]);
        if cells.iter().all(CellValue::is_blank) {
            debug!("Table under header row {} ends at blank row {}", header.row, ridx);
            break;
        }
        if parse_header(ridx, sheet).is_some() {
            debug!("Table under header row {} ends at next header {}", header.row, ridx);
            break;
        }

        let label = normalize_cell(sheet.cell(ridx, header.description_col));
        let mut values = Vec::with_capacity(width);
        for (midx, (col, month)) in header.month_columns.iter().enumerate() {
            let raw = sheet.cell(ridx, *col);
            let value = match try_parse_number(raw) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Row {} ({}), month {}: {}", ridx + 1, label, month, e);
                    table.warnings.push(format!(
                        "Valor no numérico '{}' en fila {} ({}), mes '{}'. Se usa 0.",
                        raw.to_label(),
                        ridx + 1,
                        label,
                        month
                    ));
                    0.0
                }
            };
            if value != 0.0 {
                table.presence[midx] = true;
            }
            values.push(value);
        }

        table.rows.push(DataRow {
            sheet_row: ridx,
            label,
            values,
        });
    }

    table
}

/// "1. VENTA" → "VENTA", "A) COMPRA" → "COMPRA"; labels without an ordinal are unchanged
fn strip_ordinal(label: &str) -> &str {
    let marker_len = label
        .find(|c: char| !c.is_ascii_digit())
        .filter(|&n| n > 0)
        .or_else(|| {
            let mut chars = label.chars();
            match (chars.next(), chars.next()) {
                (Some(c), Some('.' | ')')) if c.is_ascii_alphabetic() => Some(1),
                _ => None,
            }
        });
    match marker_len {
        Some(n) if label[n..].starts_with(['.', ')']) => label[n + 1..].trim_start(),
        _ => label,
    }
}

/// Sub-table a data row belongs to inside an energy sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    NoSection,
    Sale,
    Purchase,
}

impl Section {
    /// Section opened by a banner label, `None` for ordinary rows.
    ///
    /// A leading ordinal ("1.", "2)", "A.") is ignored, so "1. VENTA DE ENERGIA" is a banner.
    pub fn from_banner(label: &str) -> Option<Section> {
        let label = strip_ordinal(label);
        if SALE_BANNERS.iter().any(|b| label.starts_with(b)) {
            Some(Section::Sale)
        } else if PURCHASE_BANNERS.iter().any(|b| label.starts_with(b)) {
            Some(Section::Purchase)
        } else {
            None
        }
    }
}

/// Forward scan over row labels: NoSection → Sale/Purchase, switching on each banner
#[derive(Debug, Clone, Default)]
pub struct SectionMachine {
    state: Section,
}

impl SectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Section {
        self.state
    }

    /// Banners switch state and are consumed (`None`); data rows get their section
    pub fn feed(&mut self, label: &str) -> Option<Section> {
        match Section::from_banner(label) {
            Some(next) => {
                debug!("Section {:?} -> {:?} at '{}'", self.state, next, label);
                self.state = next;
                None
            }
            None => Some(self.state),
        }
    }
}

fn is_unset(slot: &Option<Vec<f64>>) -> bool {
    slot.as_ref().map_or(true, |v| v.iter().all(|x| *x == 0.0))
}

/// Take `values` unless the slot already holds a row with data
fn claim(slot: &mut Option<Vec<f64>>, values: &[f64]) {
    if is_unset(slot) {
        *slot = Some(values.to_vec());
    }
}

fn missing_row_warning(key: &str) -> String {
    format!("No se encontró fila para '{key}'.")
}

/// Section-aware matching for the energy table.
///
/// Regulated, free and spot rows come from the sale section; the last match seen before
/// any banner is kept as a residual and only used when the sale section had nothing for
/// that metric. Losses and ancillary services are matched anywhere.
pub fn match_energy_rows(rows: &[DataRow], width: usize) -> MatchedSeries {
    let mut scoped: Vec<Option<Vec<f64>>> = vec![None; EnergyMetric::ALL.len()];
    let mut residual: Vec<Option<Vec<f64>>> = vec![None; EnergyMetric::ALL.len()];
    let mut aux_fallback: Option<Vec<f64>> = None;
    let mut machine = SectionMachine::new();

    for row in rows {
        let Some(section) = machine.feed(&row.label) else {
            continue;
        };
        if row.label.is_empty() {
            continue;
        }

        for metric in EnergyMetric::SALE_SCOPED {
            if !matches_any(&row.label, metric.aliases()) {
                continue;
            }
            match section {
                Section::NoSection => residual[metric.index()] = Some(row.values.clone()),
                Section::Sale => claim(&mut scoped[metric.index()], &row.values),
                Section::Purchase => {}
            }
        }

        if matches_any(&row.label, PERDIDAS_ENERGY) {
            claim(&mut scoped[EnergyMetric::Perdidas.index()], &row.values);
        }

        if matches_any(&row.label, SERVICIOS_AUX_PREFERRED) {
            claim(&mut scoped[EnergyMetric::ServiciosAux.index()], &row.values);
        } else if matches_any(&row.label, SERVICIOS_AUX_FALLBACK) {
            claim(&mut aux_fallback, &row.values);
        }
    }

    let aux = EnergyMetric::ServiciosAux.index();
    if is_unset(&scoped[aux]) && aux_fallback.is_some() {
        scoped[aux] = aux_fallback;
    }

    for metric in EnergyMetric::SALE_SCOPED {
        let i = metric.index();
        if is_unset(&scoped[i]) && residual[i].is_some() {
            debug!("Using pre-banner row for '{}'", metric.key());
            scoped[i] = residual[i].take();
        }
    }

    let mut warnings = Vec::new();
    let series = EnergyMetric::ALL
        .iter()
        .map(|metric| {
            let slot = scoped[metric.index()].take();
            if is_unset(&slot) {
                warnings.push(missing_row_warning(metric.key()));
            }
            slot.unwrap_or_else(|| vec![0.0; width])
        })
        .collect();

    MatchedSeries { series, warnings }
}

/// Unscoped matching for the monetary table: first matching row per metric wins
pub fn match_sales_rows(rows: &[DataRow], width: usize) -> MatchedSeries {
    let mut warnings = Vec::new();
    let series = SalesMetric::ALL
        .iter()
        .map(|metric| {
            match rows
                .iter()
                .find(|r| !r.label.is_empty() && matches_any(&r.label, metric.aliases()))
            {
                Some(row) => row.values.clone(),
                None => {
                    warnings.push(missing_row_warning(metric.key()));
                    vec![0.0; width]
                }
            }
        })
        .collect();

    MatchedSeries { series, warnings }
}
