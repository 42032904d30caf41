//! Record assembler: merges classified lines into transactions.

use rust_decimal::Decimal;
use tracing::debug;
use trimport_core::{
    Currency, DedupScope, Direction, Isin, Money, Transaction, TransactionDraft, TxnKind,
};

use crate::error::LineIssue;
use crate::types::{DateField, LineClass, LineFields, ParsedAmount, ScanState, ScanStats, Sign};
use crate::vocabulary::{Keyword, Vocabulary};

/// Lines believed to form one transaction, not yet validated.
#[derive(Debug)]
struct Candidate {
    date: Option<DateField>,
    keyword: Option<Keyword>,
    isin: Option<Isin>,
    name_parts: Vec<String>,
    quantity: Option<Decimal>,
    amounts: Vec<Option<ParsedAmount>>,
}

impl Candidate {
    fn open(fields: LineFields) -> Self {
        let mut candidate = Self {
            date: None,
            keyword: None,
            isin: None,
            name_parts: Vec::new(),
            quantity: None,
            amounts: Vec::new(),
        };
        candidate.merge(fields);
        candidate
    }

    /// First date, keyword, ISIN and quantity win; text and amounts accumulate.
    fn merge(&mut self, fields: LineFields) {
        if self.date.is_none() {
            self.date = fields.date;
        }
        if let Some(keyword) = fields.keyword {
            if self.keyword.is_none() {
                self.keyword = Some(keyword);
            } else {
                self.name_parts.extend(fields.keyword_token);
            }
        }
        if self.isin.is_none() {
            self.isin = fields.isin;
        }
        if self.quantity.is_none() {
            self.quantity = fields.quantity;
        }
        self.name_parts.extend(fields.text);
        self.amounts.extend(fields.amounts);
    }
}

/// Join wrapped name fragments. A fragment ending in `-` is glued to the next
/// one; the hyphen is dropped when the next fragment starts lowercase.
pub fn join_wrapped<S: AsRef<str>>(parts: &[S]) -> String {
    let mut joined = String::new();
    for part in parts.iter().map(|p| p.as_ref().trim()).filter(|p| !p.is_empty()) {
        if joined.ends_with('-') {
            if part.starts_with(char::is_lowercase) {
                joined.pop();
            }
        } else if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(part);
    }
    joined
}

pub struct Assembler<'a> {
    source_pdf: &'a str,
    default_currency: Currency,
    scope: DedupScope,
    open: Option<Candidate>,
    records: Vec<Transaction>,
}

impl<'a> Assembler<'a> {
    pub fn new(source_pdf: &'a str, default_currency: Currency, scope: DedupScope) -> Self {
        Self {
            source_pdf,
            default_currency,
            scope,
            open: None,
            records: Vec::new(),
        }
    }

    pub fn state(&self) -> ScanState {
        if self.open.is_some() {
            ScanState::AssemblingRecord
        } else {
            ScanState::ExtractingLines
        }
    }

    /// Feed one classified line. `raw` is only used for logging.
    pub fn push(&mut self, class: LineClass, raw: &str, stats: &mut ScanStats) {
        match class {
            LineClass::Noise => stats.noise_lines += 1,
            LineClass::Text(text) => match self.open.as_mut() {
                Some(candidate) => candidate.name_parts.push(text),
                None => self.unparseable(raw, stats),
            },
            LineClass::Fields(mut fields) => {
                for issue in fields.issues.drain(..) {
                    debug!(source_pdf = self.source_pdf, %issue, "line issue");
                    stats.record_issue(&issue);
                }
                if fields.starts_transaction() {
                    self.close(stats);
                    self.open = Some(Candidate::open(fields));
                } else if let Some(candidate) = self.open.as_mut() {
                    candidate.merge(fields);
                } else {
                    self.unparseable(raw, stats);
                }
            }
        }
    }

    /// Close the last candidate and hand back every assembled record.
    pub fn finish(mut self, stats: &mut ScanStats) -> Vec<Transaction> {
        self.close(stats);
        stats.records = self.records.len();
        self.records
    }

    fn unparseable(&self, raw: &str, stats: &mut ScanStats) {
        let issue = LineIssue::UnparseableLine(raw.trim().to_string());
        debug!(source_pdf = self.source_pdf, %issue, "line outside any transaction");
        stats.record_issue(&issue);
    }

    fn close(&mut self, stats: &mut ScanStats) {
        let Some(candidate) = self.open.take() else {
            return;
        };
        let date = match candidate.date {
            Some(DateField::Valid(date)) => date,
            other => {
                debug!(source_pdf = self.source_pdf, date = ?other, "discarding candidate without a valid date");
                stats.discarded_candidates += 1;
                return;
            }
        };

        let (txn_type, kind) = match &candidate.keyword {
            Some(keyword) => (keyword.label.clone(), keyword.kind),
            None => (Vocabulary::FALLBACK_LABEL.to_string(), TxnKind::Other),
        };

        let mut draft = TransactionDraft::new(date, txn_type, self.source_pdf);
        draft.kind = kind;
        draft.isin = candidate.isin;
        draft.quantity = candidate.quantity;
        let name = join_wrapped(&candidate.name_parts);
        if !name.is_empty() {
            draft.instrument_name = Some(name);
        }

        // Roles are positional; a malformed slot leaves its field empty.
        if let Some(first) = candidate.amounts.first().and_then(Option::as_ref) {
            let direction = match first.sign {
                Some(Sign::Minus) => Direction::Out,
                Some(Sign::Plus) => Direction::In,
                None => kind.direction().unwrap_or(Direction::In),
            };
            let currency = first
                .currency
                .clone()
                .unwrap_or_else(|| self.default_currency.clone());
            draft.amount = Some((Money::new(first.value, currency), direction));
        }
        if candidate.amounts.len() >= 2 {
            draft.balance = candidate
                .amounts
                .last()
                .and_then(Option::as_ref)
                .map(ParsedAmount::signed_value);
        }

        self.records.push(draft.seal(self.scope));
    }
}
