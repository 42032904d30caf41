use std::path::PathBuf;
use thiserror::Error;

/// Per-document failures. A batch reports these and moves on.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no transactions section ('{marker}') found in {source_pdf}")]
    SectionNotFound { source_pdf: String, marker: String },

    #[error("failed to extract text from '{}': {detail}", path.display())]
    PdfText { path: PathBuf, detail: String },

    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pattern in statement profile: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid default currency: {0}")]
    Currency(#[from] trimport_core::CoreError),
}

/// Per-line problems. Absorbed where they happen: counted and logged, never returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineIssue {
    #[error("line matches no transaction pattern: {0:?}")]
    UnparseableLine(String),

    #[error("'{0}' is not a calendar date")]
    MalformedDate(String),

    #[error("'{0}' does not fit the statement number format")]
    MalformedAmount(String),
}
