//! Page text source.
//!
//! `pdf-extract` renders the whole document in one call and separates pages
//! with a form feed. [`PdfPages`] splits that text and hands pages out one at
//! a time, in physical order, so the pipeline can stop pulling once the
//! transactions section has closed.

use std::path::Path;
use tracing::debug;

use crate::error::IngestError;

/// Page boundary marker between pages of extracted text.
pub const PAGE_BREAK: char = '\u{000C}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// 0-based physical page index.
    pub index: usize,
    pub text: String,
}

#[derive(Debug)]
pub struct PdfPages {
    pages: std::vec::IntoIter<String>,
    next_index: usize,
}

impl PdfPages {
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        if !path.is_file() {
            return Err(IngestError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a file"),
            });
        }

        let text = pdf_extract::extract_text(path).map_err(|e| IngestError::PdfText {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        let pages = Self::from_text(&text);
        debug!(path = %path.display(), pages = pages.len(), "extracted PDF text");
        Ok(pages)
    }

    /// Split already-extracted text on [`PAGE_BREAK`].
    pub fn from_text(text: &str) -> Self {
        let mut pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
        // A trailing form feed leaves an empty pseudo-page behind.
        if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
            pages.pop();
        }
        Self {
            pages: pages.into_iter(),
            next_index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.len() == 0
    }
}

impl Iterator for PdfPages {
    type Item = RawPage;

    fn next(&mut self) -> Option<RawPage> {
        let text = self.pages.next()?;
        let page = RawPage {
            index: self.next_index,
            text,
        };
        self.next_index += 1;
        Some(page)
    }
}

/// Pages from text that was extracted elsewhere (tests, other text sources).
pub fn pages_from_texts<I, S>(texts: I) -> impl Iterator<Item = RawPage>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| RawPage {
            index,
            text: text.into(),
        })
}
