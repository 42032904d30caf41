//! Wires the stages together for one document and for a batch of documents.

use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use trimport_core::{Currency, NumberFormat, Transaction, TxnHash};

use crate::assemble::Assembler;
use crate::classify::Classifier;
use crate::config::PipelineConfig;
use crate::dedup::{DedupOutcome, Deduplicator};
use crate::error::IngestError;
use crate::pages::{PdfPages, RawPage};
use crate::section::{SectionMarker, SectionScanner};
use crate::types::{FailReason, ResolvedFormat, ScanState, ScanStats};

/// Records of one document before deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub source_pdf: String,
    pub number_format: ResolvedFormat,
    pub stats: ScanStats,
    pub records: Vec<Transaction>,
}

/// One document, extracted and deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentScan {
    pub source_pdf: String,
    pub number_format: ResolvedFormat,
    pub stats: ScanStats,
    /// New records, in statement order.
    pub records: Vec<Transaction>,
    pub new_hashes: HashSet<TxnHash>,
    pub skipped_known: usize,
    pub skipped_repeats: usize,
}

impl DocumentScan {
    fn new(extraction: Extraction, outcome: DedupOutcome) -> Self {
        Self {
            source_pdf: extraction.source_pdf,
            number_format: extraction.number_format,
            stats: extraction.stats,
            records: outcome.records,
            new_hashes: outcome.new_hashes,
            skipped_known: outcome.skipped_known,
            skipped_repeats: outcome.skipped_repeats,
        }
    }
}

#[derive(Debug)]
pub struct DocumentOutcome {
    pub source_pdf: String,
    pub result: Result<DocumentScan, IngestError>,
}

/// Result of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchScan {
    pub documents: Vec<DocumentOutcome>,
    /// Every hash accepted across the batch.
    pub new_hashes: HashSet<TxnHash>,
}

impl BatchScan {
    pub fn records(&self) -> impl Iterator<Item = &Transaction> {
        self.documents
            .iter()
            .filter_map(|d| d.result.as_ref().ok())
            .flat_map(|scan| scan.records.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &IngestError)> {
        self.documents
            .iter()
            .filter_map(|d| d.result.as_ref().err().map(|e| (d.source_pdf.as_str(), e)))
    }
}

/// Name a PDF is recorded under: its canonical path, so `./a.pdf` and `a.pdf`
/// hash alike. Falls back to the path as given when it cannot be resolved.
pub fn source_name(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

fn transition(state: &mut ScanState, next: ScanState, source_pdf: &str) {
    let from = *state;
    if from != next {
        debug!(source_pdf, from = ?from, to = ?next, "scan state");
        *state = next;
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    marker: SectionMarker,
    default_currency: Currency,
    continental: Classifier,
    anglo: Classifier,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, IngestError> {
        let vocabulary = config.vocabulary();
        let continental =
            Classifier::new(NumberFormat::Continental, vocabulary.clone(), &config.noise_patterns)?;
        let anglo = Classifier::new(NumberFormat::Anglo, vocabulary, &config.noise_patterns)?;
        Ok(Self {
            marker: config.section_marker(),
            default_currency: Currency::parse(&config.default_currency)?,
            continental,
            anglo,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn classifier(&self, format: NumberFormat) -> &Classifier {
        match format {
            NumberFormat::Continental => &self.continental,
            NumberFormat::Anglo => &self.anglo,
        }
    }

    /// Locate the section, classify its lines and assemble records.
    ///
    /// Pages are pulled one at a time and reading stops once the section has
    /// closed.
    pub fn extract<I>(&self, source_pdf: &str, pages: I) -> Result<Extraction, IngestError>
    where
        I: IntoIterator<Item = RawPage>,
    {
        let mut state = ScanState::Idle;
        let mut stats = ScanStats::default();
        transition(&mut state, ScanState::LocatingSection, source_pdf);

        let mut scanner = SectionScanner::new(&self.marker);
        let mut body: Vec<String> = Vec::new();
        for page in pages {
            stats.pages_read += 1;
            for line in page.text.lines() {
                if scanner.feed(line) {
                    body.push(line.to_string());
                }
                if scanner.is_closed() {
                    break;
                }
            }
            if scanner.is_closed() {
                debug!(source_pdf, page = page.index, "section closed, not reading further pages");
                break;
            }
        }

        if !scanner.found() {
            transition(&mut state, ScanState::Failed(FailReason::SectionNotFound), source_pdf);
            return Err(IngestError::SectionNotFound {
                source_pdf: source_pdf.to_string(),
                marker: self.marker.header().to_string(),
            });
        }
        stats.section_lines = body.len();

        let (format, detected) = self
            .config
            .number_format
            .resolve(&body.join("\n"), self.config.number_format_fallback);
        debug!(source_pdf, %format, detected, "number format");
        let classifier = self.classifier(format);

        transition(&mut state, ScanState::ExtractingLines, source_pdf);
        let mut assembler =
            Assembler::new(source_pdf, self.default_currency.clone(), self.config.dedup_scope);
        for line in &body {
            assembler.push(classifier.classify(line), line, &mut stats);
            transition(&mut state, assembler.state(), source_pdf);
        }
        let records = assembler.finish(&mut stats);
        transition(&mut state, ScanState::Done, source_pdf);

        Ok(Extraction {
            source_pdf: source_pdf.to_string(),
            number_format: ResolvedFormat { format, detected },
            stats,
            records,
        })
    }

    /// Extract and deduplicate one document against `known`.
    pub fn scan_document<I>(
        &self,
        source_pdf: &str,
        pages: I,
        known: &HashSet<TxnHash>,
    ) -> Result<DocumentScan, IngestError>
    where
        I: IntoIterator<Item = RawPage>,
    {
        let mut extraction = self.extract(source_pdf, pages)?;
        let outcome = Deduplicator::new(known).filter(std::mem::take(&mut extraction.records));
        Ok(DocumentScan::new(extraction, outcome))
    }

    pub fn scan_pdf(&self, path: &Path, known: &HashSet<TxnHash>) -> Result<DocumentScan, IngestError> {
        let pages = PdfPages::open(path)?;
        self.scan_document(&source_name(path), pages, known)
    }

    /// Scan PDFs in parallel, then deduplicate in input order.
    ///
    /// A failing document is reported in its [`DocumentOutcome`] and does not
    /// affect the others.
    pub fn scan_batch(&self, paths: &[PathBuf], known: &HashSet<TxnHash>) -> BatchScan {
        let extractions: Vec<(String, Result<Extraction, IngestError>)> = paths
            .par_iter()
            .map(|path| {
                let source_pdf = source_name(path);
                let result =
                    PdfPages::open(path).and_then(|pages| self.extract(&source_pdf, pages));
                (source_pdf, result)
            })
            .collect();
        self.deduplicate_batch(extractions, known)
    }

    /// Like [`Pipeline::scan_batch`] for text that was extracted elsewhere,
    /// given as `(source_pdf, text)` with pages separated by form feeds.
    pub fn scan_text_batch(&self, documents: &[(String, String)], known: &HashSet<TxnHash>) -> BatchScan {
        let extractions: Vec<(String, Result<Extraction, IngestError>)> = documents
            .par_iter()
            .map(|(source_pdf, text)| {
                let result = self.extract(source_pdf, PdfPages::from_text(text));
                (source_pdf.clone(), result)
            })
            .collect();
        self.deduplicate_batch(extractions, known)
    }

    fn deduplicate_batch(
        &self,
        extractions: Vec<(String, Result<Extraction, IngestError>)>,
        known: &HashSet<TxnHash>,
    ) -> BatchScan {
        let mut dedup = Deduplicator::new(known);
        let mut documents = Vec::with_capacity(extractions.len());

        for (source_pdf, result) in extractions {
            let result = match result {
                Ok(mut extraction) => {
                    let outcome = dedup.filter(std::mem::take(&mut extraction.records));
                    let scan = DocumentScan::new(extraction, outcome);
                    info!(
                        source_pdf = %scan.source_pdf,
                        format = %scan.number_format.format,
                        new = scan.records.len(),
                        known = scan.skipped_known,
                        repeated = scan.skipped_repeats,
                        unparseable = scan.stats.unparseable_lines,
                        "scanned document"
                    );
                    Ok(scan)
                }
                Err(e) => {
                    warn!(source_pdf = %source_pdf, error = %e, "skipping document");
                    Err(e)
                }
            };
            documents.push(DocumentOutcome { source_pdf, result });
        }

        BatchScan {
            documents,
            new_hashes: dedup.into_seen(),
        }
    }
}
