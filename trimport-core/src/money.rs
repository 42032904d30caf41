//! Amounts with currency, and the direction they move the account balance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CoreError;

/// ISO 4217 currency code, upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Accepts a three-letter code (`EUR`, `usd`) or one of the symbols `€ $ £`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let raw = raw.trim();
        let code = match raw {
            "€" => "EUR".to_string(),
            "$" => "USD".to_string(),
            "£" => "GBP".to_string(),
            code if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
                code.to_ascii_uppercase()
            }
            other => return Err(CoreError::InvalidCurrency(other.to_string())),
        };
        Ok(Self(code))
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

/// Which way a transaction moves the cash balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

/// A non-negative amount in a currency. The sign lives in [`Direction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.abs(),
            currency,
        }
    }

    /// `950.00 EUR`
    pub fn canonical(&self) -> String {
        format!("{:.2} {}", self.amount, self.currency)
    }

    /// `-950.00 EUR` for outflows, `+950.00 EUR` for inflows.
    pub fn signed(&self, direction: Direction) -> String {
        let sign = match direction {
            Direction::In => '+',
            Direction::Out => '-',
        };
        format!("{sign}{}", self.canonical())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
