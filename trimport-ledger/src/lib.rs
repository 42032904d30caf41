//! trimport-ledger: SQLite storage for scanned statements and CSV/JSON/XLSX export

pub mod error;
pub mod export;
pub mod store;

pub use error::LedgerError;
pub use export::{ExportFormat, export, export_to_path};
pub use store::{Ledger, StoredTransaction, file_checksum};
