use thiserror::Error;

use crate::NumberFormat;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid ISIN '{0}'")]
    InvalidIsin(String),

    #[error("'{raw}' is not a valid number in {format} format")]
    InvalidNumber { raw: String, format: NumberFormat },

    #[error("unknown currency '{0}'")]
    InvalidCurrency(String),

    #[error("'{0}' is not a SHA-256 hex digest")]
    InvalidHash(String),
}
