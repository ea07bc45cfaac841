#![allow(dead_code)]

use balance_ingest_service::balance::{CellValue, Sheet, Workbook};
use balance_ingest_service::db::pool;
use sqlx::SqlitePool;

/// Fresh in-memory database with migrations applied
pub async fn test_pool() -> SqlitePool {
    pool::connect_in_memory()
        .await
        .expect("Failed to create in-memory database")
}

pub fn title(year: i32) -> String {
    format!("BALANCE DE ENERGÍA EN MWh - AÑO {}", year)
}

/// One energy sheet with the given month headers and the five metric rows
pub fn energy_sheet(name: &str, year: i32, months: &[&str], base: f64) -> Sheet {
    let mut header: Vec<CellValue> = vec!["DESCRIPCIÓN".into()];
    header.extend(months.iter().map(|m| CellValue::from(*m)));

    let row = |label: &str, factor: f64| -> Vec<CellValue> {
        let mut cells: Vec<CellValue> = vec![label.into()];
        cells.extend((0..months.len()).map(|i| CellValue::from(base * factor + i as f64)));
        cells
    };

    let rows: Vec<Vec<CellValue>> = vec![
        vec![title(year).into()],
        vec![CellValue::Blank],
        header,
        row("A emp. Distribuidoras", 10.0),
        row("A clientes Libres", 5.0),
        row("COES", 2.0),
        row("Consumo propio de centrales", 0.5),
        row("Pérdidas Sistemas Transmisión", 0.2),
    ];
    Sheet::new(name, rows)
}

pub fn workbook(sheets: Vec<Sheet>) -> Workbook {
    Workbook::new(sheets)
}
