//! Deterministic transaction fingerprints used for deduplication.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::{CoreError, Isin, Money};

const FIELD_SEPARATOR: char = '\u{1f}';

/// Whether the originating document takes part in the fingerprint.
///
/// `PerDocument` makes re-scanning the same file the dedup unit; the same
/// statement imported under another file name is stored again. PDFs are
/// named by canonical path, so moving the statement folder also counts as
/// another file. `Global`
/// leaves the source out, so economically identical rows from different
/// files collapse into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupScope {
    #[default]
    PerDocument,
    Global,
}

impl FromStr for DedupScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-document" | "document" => Ok(DedupScope::PerDocument),
            "global" => Ok(DedupScope::Global),
            other => Err(format!("unknown dedup scope '{other}' (expected per-document or global)")),
        }
    }
}

impl fmt::Display for DedupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupScope::PerDocument => f.write_str("per-document"),
            DedupScope::Global => f.write_str("global"),
        }
    }
}

/// Lower-case hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxnHash(String);

impl TxnHash {
    pub fn from_hex(raw: &str) -> Result<Self, CoreError> {
        let raw = raw.trim();
        if raw.len() != 64 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidHash(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxnHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TxnHash {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TxnHash::from_hex(&value)
    }
}

impl From<TxnHash> for String {
    fn from(value: TxnHash) -> Self {
        value.0
    }
}

/// The normalized fields a fingerprint covers.
#[derive(Debug, Clone, Copy)]
pub struct Fingerprint<'a> {
    pub source_pdf: &'a str,
    pub date: NaiveDate,
    pub txn_type: &'a str,
    pub isin: Option<&'a Isin>,
    pub amount_in: Option<&'a Money>,
    pub amount_out: Option<&'a Money>,
    pub balance: Option<Decimal>,
}

impl Fingerprint<'_> {
    pub fn digest(&self, scope: DedupScope) -> TxnHash {
        let source = match scope {
            DedupScope::PerDocument => self.source_pdf,
            DedupScope::Global => "",
        };
        let fields = [
            source.to_string(),
            self.date.format("%Y-%m-%d").to_string(),
            self.txn_type.to_string(),
            self.isin.map(|i| i.as_str().to_string()).unwrap_or_default(),
            self.amount_in.map(Money::canonical).unwrap_or_default(),
            self.amount_out.map(Money::canonical).unwrap_or_default(),
            self.balance.map(|b| format!("{b:.2}")).unwrap_or_default(),
        ];

        let mut hasher = Sha256::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                hasher.update(FIELD_SEPARATOR.to_string().as_bytes());
            }
            hasher.update(field.as_bytes());
        }
        TxnHash(format!("{:x}", hasher.finalize()))
    }
}
