use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use trimport_core::Transaction;
use trimport_ingest::Pipeline;
use trimport_ledger::{ExportFormat, Ledger, export_to_path, file_checksum};
use walkdir::WalkDir;

use crate::config::Config;

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// PDFs named on the command line plus every PDF below `folder`.
/// Directories are walked recursively in file-name order; duplicates are dropped.
pub fn discover_pdfs(paths: &[PathBuf], folder: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();

    for root in paths.iter().map(PathBuf::as_path).chain(folder) {
        if root.is_dir() {
            for entry in WalkDir::new(root).sort_by_file_name() {
                let entry = entry.with_context(|| format!("walk {}", root.display()))?;
                if entry.file_type().is_file() && is_pdf(entry.path()) {
                    let path = entry.into_path();
                    if seen.insert(path.clone()) {
                        found.push(path);
                    }
                }
            }
        } else if root.exists() {
            if seen.insert(root.to_path_buf()) {
                found.push(root.to_path_buf());
            }
        } else {
            bail!("not found: {}", root.display());
        }
    }
    Ok(found)
}

/// Record the document and append its new transactions; returns how many were inserted.
fn store_document(
    ledger: &mut Ledger,
    path: &Path,
    source_pdf: &str,
    records: &[Transaction],
) -> Result<usize> {
    let checksum =
        file_checksum(path).with_context(|| format!("checksum {}", path.display()))?;
    let document_id = ledger.upsert_document(source_pdf, &checksum)?;
    ledger
        .append(document_id, records)
        .with_context(|| format!("store transactions from {source_pdf}"))
}

pub fn run_scan(cfg: Config, pdfs: &[PathBuf], db_path: &Path) -> Result<()> {
    if pdfs.is_empty() {
        bail!("no PDF files to scan (pass files or --folder <dir>)");
    }

    let pipeline = Pipeline::new(cfg.pipeline).context("invalid [pipeline] settings")?;
    let mut ledger =
        Ledger::open(db_path).with_context(|| format!("open ledger {}", db_path.display()))?;
    let known = ledger.known_hashes().context("read stored hashes")?;
    info!(documents = pdfs.len(), known = known.len(), "starting scan");

    let batch = pipeline.scan_batch(pdfs, &known);

    let mut inserted_total = 0;
    let mut failed = 0;
    for (path, doc) in pdfs.iter().zip(&batch.documents) {
        match &doc.result {
            Ok(scan) => match store_document(&mut ledger, path, &doc.source_pdf, &scan.records) {
                Ok(inserted) => {
                    inserted_total += inserted;
                    println!(
                        "{}: {} new, {} already stored, {} repeated, {} unparseable lines ({} numbers)",
                        doc.source_pdf,
                        inserted,
                        scan.skipped_known,
                        scan.skipped_repeats,
                        scan.stats.unparseable_lines,
                        scan.number_format.format,
                    );
                }
                Err(e) => {
                    failed += 1;
                    warn!(source_pdf = %doc.source_pdf, error = %e, "not stored");
                    println!("{}: not stored ({e:#})", doc.source_pdf);
                }
            },
            Err(e) => {
                failed += 1;
                warn!(source_pdf = %doc.source_pdf, "not imported");
                println!("{}: skipped ({e})", doc.source_pdf);
            }
        }
    }

    println!(
        "\nScanned {} documents ({} failed), stored {} new transactions. Ledger {} now holds {}.",
        pdfs.len(),
        failed,
        inserted_total,
        db_path.display(),
        ledger.count()?
    );
    Ok(())
}

pub fn run_export(
    db_path: &Path,
    format: Option<ExportFormat>,
    out: &Path,
    limit: Option<usize>,
) -> Result<()> {
    if !db_path.exists() {
        bail!("no ledger at {} (run `trimport scan` first)", db_path.display());
    }
    let format = format
        .or_else(|| ExportFormat::from_extension(out))
        .unwrap_or(ExportFormat::Csv);

    let ledger =
        Ledger::open(db_path).with_context(|| format!("open ledger {}", db_path.display()))?;
    let rows = ledger.list(limit)?;
    export_to_path(&rows, format, out).with_context(|| format!("export to {}", out.display()))?;
    println!("Exported {} transactions to {} ({format})", rows.len(), out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_walks_folders_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2023");
        fs::create_dir_all(&nested).unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::write(nested.join("c.pdf"), b"x").unwrap();

        let found = discover_pdfs(&[dir.path().join("b.pdf")], Some(dir.path())).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["b.pdf", "2023/c.pdf", "a.PDF"]);
    }

    #[test]
    fn test_discover_rejects_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_pdfs(&[dir.path().join("missing.pdf")], None).is_err());
    }

    #[test]
    fn test_export_requires_existing_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_export(&dir.path().join("none.db"), None, &dir.path().join("out.csv"), None)
            .unwrap_err();
        assert!(err.to_string().contains("no ledger"));
    }

    #[test]
    fn test_store_failure_is_reported_per_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(&dir.path().join("ledger.db")).unwrap();

        let missing = dir.path().join("gone.pdf");
        assert!(store_document(&mut ledger, &missing, "gone.pdf", &[]).is_err());

        let present = dir.path().join("here.pdf");
        fs::write(&present, b"%PDF-1.4").unwrap();
        assert_eq!(store_document(&mut ledger, &present, "here.pdf", &[]).unwrap(), 0);
        let checksum = file_checksum(&present).unwrap();
        assert!(ledger.document_id(&checksum).unwrap().is_some());
    }
}
