//! Locale-specific decimal formatting of statement numbers.
//!
//! Brokerage statements print amounts either continental style (`1.234,56`)
//! or anglo style (`1,234.56`). The format is a per-document property, so the
//! extractor receives it as a value instead of assuming one.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumberFormat {
    /// `1.234,56`
    #[default]
    Continental,
    /// `1,234.56`
    Anglo,
}

fn date_like_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{1,2}[./]\d{1,2}[./]\d{4}\b").expect("date-like regex"))
}

impl NumberFormat {
    pub fn decimal_separator(self) -> char {
        match self {
            NumberFormat::Continental => ',',
            NumberFormat::Anglo => '.',
        }
    }

    pub fn grouping_separator(self) -> char {
        match self {
            NumberFormat::Continental => '.',
            NumberFormat::Anglo => ',',
        }
    }

    /// Regex alternation matching a money-shaped number (exactly two decimals).
    ///
    /// Unanchored; callers add their own boundaries.
    pub fn amount_pattern(self) -> String {
        let group = regex::escape(&self.grouping_separator().to_string());
        let dec = regex::escape(&self.decimal_separator().to_string());
        format!(r"\d{{1,3}}(?:{group}\d{{3}})+{dec}\d{{2}}|\d+{dec}\d{{2}}")
    }

    /// Parse a number written in this format.
    ///
    /// Grouping separators are only accepted between groups of three digits,
    /// so `1.5` is rejected in continental format rather than read as `15`.
    pub fn parse(self, raw: &str) -> Result<Decimal, CoreError> {
        let invalid = || CoreError::InvalidNumber {
            raw: raw.to_string(),
            format: self,
        };

        let trimmed = raw.trim();
        let (negative, body) = match trimmed.strip_prefix(&['-', '\u{2212}'][..]) {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (int_part, frac_part) = match body.rsplit_once(self.decimal_separator()) {
            Some((int_part, frac)) => (int_part, Some(frac)),
            None => (body, None),
        };

        let groups: Vec<&str> = int_part.split(self.grouping_separator()).collect();
        if groups
            .iter()
            .any(|g| g.is_empty() || !g.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(invalid());
        }
        if groups.len() > 1 && (groups[0].len() > 3 || groups[1..].iter().any(|g| g.len() != 3)) {
            return Err(invalid());
        }

        let mut canonical = groups.concat();
        if let Some(frac) = frac_part {
            if frac.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            canonical.push('.');
            canonical.push_str(frac);
        }

        let value = Decimal::from_str(&canonical).map_err(|_| invalid())?;
        Ok(if negative { -value } else { value })
    }

    /// Guess the format from money-shaped numbers in `text`.
    ///
    /// Dates are ignored (`01.03.2023` would otherwise count as anglo `01.03`).
    /// Returns `None` when neither format is seen or both are seen equally often.
    pub fn detect(text: &str) -> Option<NumberFormat> {
        let without_dates = date_like_re().replace_all(text, " ");

        let count = |format: NumberFormat| -> usize {
            let pattern = format!(r"\b(?:{})\b", format.amount_pattern());
            Regex::new(&pattern)
                .map(|re| re.find_iter(&without_dates).count())
                .unwrap_or(0)
        };

        let continental = count(NumberFormat::Continental);
        let anglo = count(NumberFormat::Anglo);
        match continental.cmp(&anglo) {
            std::cmp::Ordering::Greater => Some(NumberFormat::Continental),
            std::cmp::Ordering::Less => Some(NumberFormat::Anglo),
            std::cmp::Ordering::Equal => None,
        }
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberFormat::Continental => write!(f, "continental"),
            NumberFormat::Anglo => write!(f, "anglo"),
        }
    }
}

impl FromStr for NumberFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continental" | "de" | "eu" => Ok(NumberFormat::Continental),
            "anglo" | "en" | "us" => Ok(NumberFormat::Anglo),
            other => Err(format!("unknown number format '{other}' (expected continental or anglo)")),
        }
    }
}
