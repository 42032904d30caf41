//! International Securities Identification Numbers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// 12 characters: 2-letter country prefix, 9 alphanumerics, 1 check digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isin(String);

impl Isin {
    /// Validates the shape only. Use [`Isin::has_valid_check_digit`] for the checksum.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let raw = raw.trim();
        let bytes = raw.as_bytes();
        let shape_ok = bytes.len() == 12
            && bytes[..2].iter().all(u8::is_ascii_uppercase)
            && bytes[2..11]
                .iter()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            && bytes[11].is_ascii_digit();
        if !shape_ok {
            return Err(CoreError::InvalidIsin(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn country(&self) -> &str {
        &self.0[..2]
    }

    /// Luhn check over the digit expansion (`A` = 10 … `Z` = 35) of the first 11 characters.
    pub fn has_valid_check_digit(&self) -> bool {
        let mut digits: Vec<u32> = Vec::with_capacity(22);
        for c in self.0[..11].chars() {
            match c.to_digit(36) {
                Some(v) if v >= 10 => {
                    digits.push(v / 10);
                    digits.push(v % 10);
                }
                Some(v) => digits.push(v),
                None => return false,
            }
        }

        let sum: u32 = digits
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &d)| {
                if i % 2 == 0 {
                    let doubled = d * 2;
                    doubled / 10 + doubled % 10
                } else {
                    d
                }
            })
            .sum();

        let expected = (10 - sum % 10) % 10;
        self.0[11..].chars().next().and_then(|c| c.to_digit(10)) == Some(expected)
    }
}

impl fmt::Display for Isin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Isin {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Isin::parse(s)
    }
}

impl TryFrom<String> for Isin {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Isin::parse(&value)
    }
}

impl From<Isin> for String {
    fn from(value: Isin) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shape() {
        assert!(Isin::parse("DE0007164600").is_ok());
        assert!(Isin::parse("IE00B4L5Y983").is_ok());
        assert!(Isin::parse("de0007164600").is_err());
        assert!(Isin::parse("DE000716460").is_err());
        assert!(Isin::parse("DE000716460X").is_err());
    }

    #[test]
    fn test_check_digit() {
        assert!(Isin::parse("DE0007164600").unwrap().has_valid_check_digit());
        assert!(Isin::parse("US0378331005").unwrap().has_valid_check_digit());
        assert!(Isin::parse("IE00B4L5Y983").unwrap().has_valid_check_digit());
        assert!(!Isin::parse("DE0007164601").unwrap().has_valid_check_digit());
    }

    #[test]
    fn test_country() {
        assert_eq!(Isin::parse("US0378331005").unwrap().country(), "US");
    }
}
