//! The SQLite ledger: one row per scanned document, one per stored transaction.

use chrono::{NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use trimport_core::{Transaction, TxnHash};

use crate::error::LedgerError;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// A transaction as read back from the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub txn_type: String,
    pub isin: Option<String>,
    pub instrument_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub amount_in: Option<Decimal>,
    pub amount_out: Option<Decimal>,
    pub currency: Option<String>,
    pub balance: Option<Decimal>,
    pub source_pdf: String,
    pub txn_hash: String,
}

/// Column values exactly as stored.
struct RawRow {
    date: String,
    txn_type: String,
    isin: Option<String>,
    instrument_name: Option<String>,
    quantity: Option<String>,
    amount_in: Option<String>,
    amount_out: Option<String>,
    currency: Option<String>,
    balance: Option<String>,
    source_pdf: String,
    txn_hash: String,
}

fn decimal_column(column: &str, raw: Option<String>) -> Result<Option<Decimal>, LedgerError> {
    raw.map(|text| {
        Decimal::from_str(&text)
            .map_err(|e| LedgerError::Corrupt(format!("{column} '{text}': {e}")))
    })
    .transpose()
}

impl TryFrom<RawRow> for StoredTransaction {
    type Error = LedgerError;

    fn try_from(raw: RawRow) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d")
            .map_err(|e| LedgerError::Corrupt(format!("date '{}': {e}", raw.date)))?;
        Ok(Self {
            date,
            txn_type: raw.txn_type,
            isin: raw.isin,
            instrument_name: raw.instrument_name,
            quantity: decimal_column("quantity", raw.quantity)?,
            amount_in: decimal_column("amount_in", raw.amount_in)?,
            amount_out: decimal_column("amount_out", raw.amount_out)?,
            currency: raw.currency,
            balance: decimal_column("balance", raw.balance)?,
            source_pdf: raw.source_pdf,
            txn_hash: raw.txn_hash,
        })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LedgerError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        debug!(path = %path.display(), "opening ledger");
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, LedgerError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Every fingerprint stored so far; the pipeline's dedup snapshot.
    pub fn known_hashes(&self) -> Result<HashSet<TxnHash>, LedgerError> {
        let mut stmt = self.conn.prepare("SELECT txn_hash FROM transactions")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut hashes = HashSet::new();
        for raw in rows {
            let raw = raw?;
            let hash = TxnHash::from_hex(&raw)
                .map_err(|e| LedgerError::Corrupt(e.to_string()))?;
            hashes.insert(hash);
        }
        Ok(hashes)
    }

    /// Register a scanned file and return its id. A file already seen (same
    /// checksum) keeps its id; its name and scan time are refreshed.
    pub fn upsert_document(&self, source_pdf: &str, checksum: &str) -> Result<i64, LedgerError> {
        self.conn.execute(
            r#"
            INSERT INTO documents(source_pdf, checksum, scanned_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(checksum) DO UPDATE SET
                source_pdf = excluded.source_pdf,
                scanned_at = excluded.scanned_at
            "#,
            params![source_pdf, checksum, now()],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM documents WHERE checksum = ?1",
            params![checksum],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn document_id(&self, checksum: &str) -> Result<Option<i64>, LedgerError> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM documents WHERE checksum = ?1",
                params![checksum],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Store `records` under `document_id` in one SQL transaction.
    /// Rows whose hash is already stored are skipped; returns how many were inserted.
    pub fn append(&mut self, document_id: i64, records: &[Transaction]) -> Result<usize, LedgerError> {
        let created_at = now();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO transactions(
                    document_id, date, type, isin, instrument_name, quantity,
                    amount_in, amount_out, currency, balance, source_pdf, txn_hash, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )?;
            for record in records {
                let currency = record
                    .amount_in
                    .as_ref()
                    .or(record.amount_out.as_ref())
                    .map(|m| m.currency.as_str().to_string());
                inserted += stmt.execute(params![
                    document_id,
                    record.date.format("%Y-%m-%d").to_string(),
                    record.txn_type,
                    record.isin.as_ref().map(|i| i.as_str().to_string()),
                    record.instrument_name,
                    record.quantity.map(|q| q.normalize().to_string()),
                    record.amount_in.as_ref().map(|m| format!("{:.2}", m.amount)),
                    record.amount_out.as_ref().map(|m| format!("{:.2}", m.amount)),
                    currency,
                    record.balance.map(|b| format!("{b:.2}")),
                    record.source_pdf,
                    record.txn_hash.as_str(),
                    created_at,
                ])?;
            }
        }
        tx.commit()?;
        debug!(document_id, offered = records.len(), inserted, "appended transactions");
        Ok(inserted)
    }

    /// Stored transactions in insertion order, at most `limit` of them.
    pub fn list(&self, limit: Option<usize>) -> Result<Vec<StoredTransaction>, LedgerError> {
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let mut stmt = self.conn.prepare(
            r#"
            SELECT date, type, isin, instrument_name, quantity, amount_in, amount_out,
                   currency, balance, source_pdf, txn_hash
            FROM transactions
            ORDER BY id
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(RawRow {
                date: row.get(0)?,
                txn_type: row.get(1)?,
                isin: row.get(2)?,
                instrument_name: row.get(3)?,
                quantity: row.get(4)?,
                amount_in: row.get(5)?,
                amount_out: row.get(6)?,
                currency: row.get(7)?,
                balance: row.get(8)?,
                source_pdf: row.get(9)?,
                txn_hash: row.get(10)?,
            })
        })?;

        let mut out = Vec::new();
        for raw in rows {
            out.push(StoredTransaction::try_from(raw?)?);
        }
        Ok(out)
    }

    pub fn count(&self) -> Result<usize, LedgerError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

/// Hex SHA-256 of the file's bytes; identifies a document across renames.
pub fn file_checksum(path: &Path) -> Result<String, LedgerError> {
    let mut file = File::open(path).map_err(|source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(format!("{:x}", hasher.finalize()))
}
