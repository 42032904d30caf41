use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use trimport_core::{Currency, Isin, NumberFormat};

use crate::error::LineIssue;
use crate::vocabulary::Keyword;

/// Explicit sign printed in front of an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

/// A money-shaped number found on a line, before the assembler decides
/// whether it is the transaction amount or the running balance.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAmount {
    /// Magnitude, never negative.
    pub value: Decimal,
    pub sign: Option<Sign>,
    pub currency: Option<Currency>,
}

impl ParsedAmount {
    pub fn signed_value(&self) -> Decimal {
        match self.sign {
            Some(Sign::Minus) => -self.value,
            _ => self.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateField {
    Valid(NaiveDate),
    /// Looked like a date but is not one (`31.02.2023`).
    Malformed(String),
}

/// Everything the classifier recognized on one line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineFields {
    /// Set when the line starts with a date, or carries one next to a type or
    /// an amount.
    pub date: Option<DateField>,
    pub keyword: Option<Keyword>,
    /// The token the keyword was read from, as printed.
    pub keyword_token: Option<String>,
    pub isin: Option<Isin>,
    pub quantity: Option<Decimal>,
    /// In line order; `None` marks an amount that did not parse.
    pub amounts: Vec<Option<ParsedAmount>>,
    /// Residual text once every recognized field is removed.
    pub text: Option<String>,
    pub issues: Vec<LineIssue>,
}

impl LineFields {
    pub fn starts_transaction(&self) -> bool {
        self.date.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineClass {
    /// Blank lines, column titles, page footers.
    Noise,
    /// No recognized field; may continue the open transaction's name.
    Text(String),
    Fields(LineFields),
}

/// Where a document scan currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanState {
    Idle,
    LocatingSection,
    ExtractingLines,
    AssemblingRecord,
    Done,
    Failed(FailReason),
}

/// Why a document scan ended in [`ScanState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailReason {
    SectionNotFound,
}

/// Counters for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub pages_read: usize,
    pub section_lines: usize,
    pub noise_lines: usize,
    pub unparseable_lines: usize,
    pub malformed_dates: usize,
    pub malformed_amounts: usize,
    pub discarded_candidates: usize,
    pub records: usize,
}

impl ScanStats {
    pub fn record_issue(&mut self, issue: &LineIssue) {
        match issue {
            LineIssue::UnparseableLine(_) => self.unparseable_lines += 1,
            LineIssue::MalformedDate(_) => self.malformed_dates += 1,
            LineIssue::MalformedAmount(_) => self.malformed_amounts += 1,
        }
    }
}

/// Which number format a document was read with, and whether it was guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedFormat {
    pub format: NumberFormat,
    pub detected: bool,
}
