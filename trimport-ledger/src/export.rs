//! CSV, JSON and XLSX export of stored transactions.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::Workbook;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::error::LedgerError;
use crate::store::StoredTransaction;

/// Export column order; matches the field order of [`StoredTransaction`].
pub const COLUMNS: [&str; 11] = [
    "date",
    "type",
    "isin",
    "instrument_name",
    "quantity",
    "amount_in",
    "amount_out",
    "currency",
    "balance",
    "source_pdf",
    "txn_hash",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    /// Guess from a file extension (`.csv`, `.json`, `.xlsx`).
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(format!(
                "unsupported export format '{other}' (expected csv, json or xlsx)"
            )),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => f.write_str("csv"),
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Xlsx => f.write_str("xlsx"),
        }
    }
}

pub fn export<W: Write>(
    rows: &[StoredTransaction],
    format: ExportFormat,
    mut writer: W,
) -> Result<(), LedgerError> {
    match format {
        ExportFormat::Csv => {
            // Header written by hand so an empty export still has one.
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer);
            wtr.write_record(COLUMNS)?;
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        ExportFormat::Xlsx => {
            writer.write_all(&xlsx_workbook(rows)?)?;
            writer.flush()?;
        }
    }
    Ok(())
}

enum Cell<'a> {
    Date(NaiveDate),
    Text(&'a str),
    Number(Decimal),
}

fn text(value: &Option<String>) -> Option<Cell<'_>> {
    value.as_deref().map(Cell::Text)
}

/// Cells of one row in [`COLUMNS`] order.
fn cells(row: &StoredTransaction) -> [Option<Cell<'_>>; 11] {
    [
        Some(Cell::Date(row.date)),
        Some(Cell::Text(&row.txn_type)),
        text(&row.isin),
        text(&row.instrument_name),
        row.quantity.map(Cell::Number),
        row.amount_in.map(Cell::Number),
        row.amount_out.map(Cell::Number),
        text(&row.currency),
        row.balance.map(Cell::Number),
        Some(Cell::Text(&row.source_pdf)),
        Some(Cell::Text(&row.txn_hash)),
    ]
}

/// One sheet, header row first; decimals become numeric cells, missing values stay blank.
fn xlsx_workbook(rows: &[StoredTransaction]) -> Result<Vec<u8>, LedgerError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("transactions")?;

    for (col, title) in COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *title)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        for (col, cell) in cells(row).into_iter().enumerate() {
            match cell {
                Some(Cell::Date(date)) => {
                    sheet.write_string(r, col as u16, date.format("%Y-%m-%d").to_string())?;
                }
                Some(Cell::Text(value)) => {
                    sheet.write_string(r, col as u16, value)?;
                }
                Some(Cell::Number(value)) => {
                    let as_float = value.to_f64().ok_or_else(|| {
                        LedgerError::Corrupt(format!("{value} does not fit a spreadsheet number"))
                    })?;
                    sheet.write_number(r, col as u16, as_float)?;
                }
                None => {}
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

pub fn export_to_path(
    rows: &[StoredTransaction],
    format: ExportFormat,
    path: &Path,
) -> Result<(), LedgerError> {
    let file = File::create(path).map_err(|source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    export(rows, format, BufWriter::new(file))
}
