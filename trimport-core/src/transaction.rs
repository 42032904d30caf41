//! Transaction records extracted from a statement's transactions section.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::hash::Fingerprint;
use crate::{DedupScope, Direction, Isin, Money, TxnHash};

/// Classification behind a statement keyword (`Kauf` → `Buy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnKind {
    Buy,
    Sell,
    Dividend,
    Interest,
    Fee,
    Tax,
    Deposit,
    Withdrawal,
    Transfer,
    #[default]
    Other,
}

impl TxnKind {
    /// Cash direction implied by the kind; `None` when only the sign can tell.
    pub fn direction(self) -> Option<Direction> {
        match self {
            TxnKind::Buy | TxnKind::Fee | TxnKind::Tax | TxnKind::Withdrawal => Some(Direction::Out),
            TxnKind::Sell | TxnKind::Dividend | TxnKind::Interest | TxnKind::Deposit => {
                Some(Direction::In)
            }
            TxnKind::Transfer | TxnKind::Other => None,
        }
    }
}

/// A finished, fingerprinted transaction.
///
/// At most one of `amount_in` / `amount_out` is set; [`TransactionDraft::seal`]
/// is the only constructor and derives both from a single amount + direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub txn_type: String,
    #[serde(skip)]
    pub kind: TxnKind,
    pub isin: Option<Isin>,
    pub instrument_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub amount_in: Option<Money>,
    pub amount_out: Option<Money>,
    pub balance: Option<Decimal>,
    pub source_pdf: String,
    pub txn_hash: TxnHash,
}

impl Transaction {
    pub fn direction(&self) -> Option<Direction> {
        match (&self.amount_in, &self.amount_out) {
            (Some(_), _) => Some(Direction::In),
            (None, Some(_)) => Some(Direction::Out),
            (None, None) => None,
        }
    }

    /// Canonical signed amount, e.g. `-950.00 EUR`.
    pub fn signed_amount(&self) -> Option<String> {
        match (&self.amount_in, &self.amount_out) {
            (Some(m), _) => Some(m.signed(Direction::In)),
            (None, Some(m)) => Some(m.signed(Direction::Out)),
            (None, None) => None,
        }
    }

    /// Recompute the fingerprint from the current field values.
    pub fn fingerprint(&self, scope: DedupScope) -> TxnHash {
        Fingerprint {
            source_pdf: &self.source_pdf,
            date: self.date,
            txn_type: &self.txn_type,
            isin: self.isin.as_ref(),
            amount_in: self.amount_in.as_ref(),
            amount_out: self.amount_out.as_ref(),
            balance: self.balance,
        }
        .digest(scope)
    }
}

/// Fields of a transaction before it is fingerprinted.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub date: NaiveDate,
    pub txn_type: String,
    pub kind: TxnKind,
    pub isin: Option<Isin>,
    pub instrument_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub amount: Option<(Money, Direction)>,
    pub balance: Option<Decimal>,
    pub source_pdf: String,
}

impl TransactionDraft {
    pub fn new(date: NaiveDate, txn_type: impl Into<String>, source_pdf: impl Into<String>) -> Self {
        Self {
            date,
            txn_type: txn_type.into(),
            kind: TxnKind::Other,
            isin: None,
            instrument_name: None,
            quantity: None,
            amount: None,
            balance: None,
            source_pdf: source_pdf.into(),
        }
    }

    pub fn seal(self, scope: DedupScope) -> Transaction {
        let (amount_in, amount_out) = match self.amount {
            Some((money, Direction::In)) => (Some(money), None),
            Some((money, Direction::Out)) => (None, Some(money)),
            None => (None, None),
        };

        let txn_hash = Fingerprint {
            source_pdf: &self.source_pdf,
            date: self.date,
            txn_type: &self.txn_type,
            isin: self.isin.as_ref(),
            amount_in: amount_in.as_ref(),
            amount_out: amount_out.as_ref(),
            balance: self.balance,
        }
        .digest(scope);

        Transaction {
            date: self.date,
            txn_type: self.txn_type,
            kind: self.kind,
            isin: self.isin,
            instrument_name: self.instrument_name,
            quantity: self.quantity,
            amount_in,
            amount_out,
            balance: self.balance,
            source_pdf: self.source_pdf,
            txn_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Currency;

    fn draft() -> TransactionDraft {
        let mut d = TransactionDraft::new(
            NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            "Kauf",
            "statement.pdf",
        );
        d.kind = TxnKind::Buy;
        d.isin = Some(Isin::parse("DE0007164600").unwrap());
        d.amount = Some((Money::new(Decimal::new(95000, 2), Currency::eur()), Direction::Out));
        d.balance = Some(Decimal::new(1234567, 2));
        d
    }

    #[test]
    fn test_seal_sets_exactly_one_side() {
        let txn = draft().seal(DedupScope::PerDocument);
        assert!(txn.amount_in.is_none());
        assert_eq!(txn.amount_out.as_ref().unwrap().canonical(), "950.00 EUR");
        assert_eq!(txn.direction(), Some(Direction::Out));
        assert_eq!(txn.signed_amount().as_deref(), Some("-950.00 EUR"));
    }

    #[test]
    fn test_hash_matches_recomputed_fingerprint() {
        let txn = draft().seal(DedupScope::PerDocument);
        assert_eq!(txn.fingerprint(DedupScope::PerDocument), txn.txn_hash);
        assert_ne!(txn.fingerprint(DedupScope::Global), txn.txn_hash);
    }

    #[test]
    fn test_no_amount_is_allowed() {
        let mut d = draft();
        d.amount = None;
        let txn = d.seal(DedupScope::PerDocument);
        assert_eq!(txn.direction(), None);
        assert!(txn.amount_in.is_none() && txn.amount_out.is_none());
    }

    #[test]
    fn test_kind_direction() {
        assert_eq!(TxnKind::Buy.direction(), Some(Direction::Out));
        assert_eq!(TxnKind::Dividend.direction(), Some(Direction::In));
        assert_eq!(TxnKind::Transfer.direction(), None);
    }

    #[test]
    fn test_serializes_type_field() {
        let txn = draft().seal(DedupScope::PerDocument);
        let json = serde_json::to_value(&txn).unwrap();
        assert_eq!(json["type"], "Kauf");
        assert_eq!(json["date"], "2023-03-01");
        assert!(json.get("kind").is_none());
    }
}
