//! trimport-core: domain types shared by the statement pipeline, the ledger and the CLI

pub mod error;
pub mod hash;
pub mod isin;
pub mod money;
pub mod number;
pub mod transaction;

pub use error::CoreError;
pub use hash::{DedupScope, TxnHash};
pub use isin::Isin;
pub use money::{Currency, Direction, Money};
pub use number::NumberFormat;
pub use transaction::{Transaction, TransactionDraft, TxnKind};
