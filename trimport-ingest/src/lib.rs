//! trimport-ingest: statement text → transactions.
//!
//! Pages come in through [`pages`], the transactions section is cut out by
//! [`section`], each line is classified by [`classify`], multi-line entries are
//! merged by [`assemble`] and repeats are dropped by [`dedup`]. [`pipeline`]
//! wires the stages together per document and per batch.

pub mod assemble;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod pages;
pub mod pipeline;
pub mod section;
pub mod types;
pub mod vocabulary;

pub use assemble::Assembler;
pub use classify::Classifier;
pub use config::{NumberPolicy, PipelineConfig};
pub use dedup::{DedupOutcome, Deduplicator};
pub use error::{IngestError, LineIssue};
pub use pages::{PdfPages, RawPage};
pub use pipeline::{BatchScan, DocumentOutcome, DocumentScan, Extraction, Pipeline, source_name};
pub use section::{SectionMarker, locate_section};
pub use types::{FailReason, LineClass, LineFields, ScanState, ScanStats};
pub use vocabulary::{Keyword, Vocabulary};
