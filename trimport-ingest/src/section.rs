//! Locating the transactions section inside statement text.
//!
//! Header matching is done on a folded form of both sides so that case,
//! umlaut spelling and the usual UTF-8 mojibake (`Umsatz√ºbersicht`,
//! `UmsatzÃ¼bersicht`) do not hide the marker.

use crate::error::IngestError;
use crate::pages::PAGE_BREAK;

/// UTF-8 umlauts decoded as Mac Roman (`√º`) or Windows-1252 (`Ã¼`).
const MOJIBAKE: &[(&str, &str)] = &[
    ("Ã¤", "ä"),
    ("Ã¶", "ö"),
    ("Ã¼", "ü"),
    ("ÃŸ", "ß"),
    ("Ã„", "Ä"),
    ("Ã–", "Ö"),
    ("Ãœ", "Ü"),
    ("√§", "ä"),
    ("√∂", "ö"),
    ("√º", "ü"),
    ("√ü", "ß"),
    ("√Ñ", "Ä"),
    ("√ñ", "Ö"),
    ("√ú", "Ü"),
];

fn repair_mojibake(text: &str) -> String {
    let mut repaired = text.to_string();
    for (broken, fixed) in MOJIBAKE {
        if repaired.contains(broken) {
            repaired = repaired.replace(broken, fixed);
        }
    }
    repaired
}

/// Lowercase, umlauts transliterated (`ü` → `ue`), ASCII alphanumerics only.
pub(crate) fn fold(text: &str) -> String {
    let repaired = repair_mojibake(text);
    let mut out = String::with_capacity(repaired.len());
    for c in repaired.chars().flat_map(char::to_lowercase) {
        match c {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'ß' => out.push_str("ss"),
            c if c.is_ascii_alphanumeric() => out.push(c),
            _ => {}
        }
    }
    out
}

/// Every non-ASCII character dropped. Catches mojibake the table does not know.
fn skeleton(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Phrase {
    text: String,
    folded: String,
    skeleton: String,
}

impl Phrase {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            folded: fold(text),
            skeleton: skeleton(text),
        }
    }

    fn occurs_in(&self, line: &str) -> bool {
        if self.folded.is_empty() {
            return false;
        }
        fold(line).contains(&self.folded)
            || (!self.skeleton.is_empty() && skeleton(line).contains(&self.skeleton))
    }
}

/// The header phrase opening the section and the headers that end it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMarker {
    header: Phrase,
    boundaries: Vec<Phrase>,
}

impl SectionMarker {
    pub fn new<S: AsRef<str>>(header: &str, boundaries: &[S]) -> Self {
        Self {
            header: Phrase::new(header),
            boundaries: boundaries.iter().map(|b| Phrase::new(b.as_ref())).collect(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header.text
    }

    pub fn is_header(&self, line: &str) -> bool {
        self.header.occurs_in(line)
    }

    pub fn is_boundary(&self, line: &str) -> bool {
        self.boundaries.iter().any(|b| b.occurs_in(line))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    Searching,
    Inside,
    Closed,
}

/// Line-at-a-time locator, for callers that read pages lazily.
#[derive(Debug)]
pub struct SectionScanner<'m> {
    marker: &'m SectionMarker,
    state: SectionState,
}

impl<'m> SectionScanner<'m> {
    pub fn new(marker: &'m SectionMarker) -> Self {
        Self {
            marker,
            state: SectionState::Searching,
        }
    }

    pub fn state(&self) -> SectionState {
        self.state
    }

    pub fn found(&self) -> bool {
        self.state != SectionState::Searching
    }

    pub fn is_closed(&self) -> bool {
        self.state == SectionState::Closed
    }

    /// Feed one line; `true` when it belongs to the section body.
    ///
    /// Header lines themselves are not part of the body. A header repeated at
    /// the top of a continuation page is skipped without closing the section.
    pub fn feed(&mut self, line: &str) -> bool {
        match self.state {
            SectionState::Searching => {
                if self.marker.is_header(line) {
                    self.state = SectionState::Inside;
                }
                false
            }
            SectionState::Inside => {
                if self.marker.is_header(line) {
                    return false;
                }
                if self.marker.is_boundary(line) {
                    self.state = SectionState::Closed;
                    return false;
                }
                true
            }
            SectionState::Closed => false,
        }
    }
}

/// The section body within `text`: from the line after the first header to the
/// start of the next boundary line, or the end of the document.
///
/// Same rules as [`SectionScanner`]; page breaks inside the body are preserved.
pub fn locate_section<'t>(
    text: &'t str,
    marker: &SectionMarker,
    source_pdf: &str,
) -> Result<&'t str, IngestError> {
    let mut scanner = SectionScanner::new(marker);
    let mut body: Option<(usize, usize)> = None;
    let mut offset = 0;

    for line in text.split_inclusive(['\n', PAGE_BREAK]) {
        let line_start = offset;
        offset += line.len();
        let was_searching = !scanner.found();
        let in_body = scanner.feed(line);

        if was_searching && scanner.found() {
            body = Some((offset, offset));
        } else if let Some((_, end)) = body.as_mut() {
            if in_body || !scanner.is_closed() {
                *end = offset;
            } else {
                *end = line_start;
            }
        }
        if scanner.is_closed() {
            break;
        }
    }

    match body {
        Some((start, end)) => Ok(&text[start..end]),
        None => Err(IngestError::SectionNotFound {
            source_pdf: source_pdf.to_string(),
            marker: marker.header().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> SectionMarker {
        SectionMarker::new("Umsatzübersicht", &["Barmittelübersicht", "Hinweise zum Kontoauszug"])
    }

    #[test]
    fn test_fold_transliterates_and_repairs() {
        assert_eq!(fold("UMSATZÜBERSICHT"), "umsatzuebersicht");
        assert_eq!(fold("Umsatz√ºbersicht"), "umsatzuebersicht");
        assert_eq!(fold("UmsatzÃ¼bersicht"), "umsatzuebersicht");
        assert_eq!(fold("Gebühr:"), "gebuehr");
    }

    #[test]
    fn test_header_matching_tolerates_artifacts() {
        let m = marker();
        assert!(m.is_header("UMSATZÜBERSICHT"));
        assert!(m.is_header("  Umsatz√ºbersicht  "));
        assert!(m.is_header("Umsatz?bersicht"));
        assert!(m.is_header("Umsatzuebersicht"));
        assert!(!m.is_header("Depotübersicht"));
    }

    #[test]
    fn test_locate_section_cuts_at_boundary() {
        let text = "Kontoauszug\nUMSATZÜBERSICHT\nline one\nline two\nBARMITTELÜBERSICHT\nother";
        let body = locate_section(text, &marker(), "a.pdf").unwrap();
        assert_eq!(body, "line one\nline two\n");
    }

    #[test]
    fn test_locate_section_runs_to_end_across_pages() {
        let text = "Umsatzübersicht\nline one\u{000C}line two";
        let body = locate_section(text, &marker(), "a.pdf").unwrap();
        assert_eq!(body, "line one\u{000C}line two");
    }

    #[test]
    fn test_locate_section_missing_marker() {
        let err = locate_section("Depotauszug\nnothing", &marker(), "a.pdf").unwrap_err();
        match err {
            IngestError::SectionNotFound { source_pdf, marker } => {
                assert_eq!(source_pdf, "a.pdf");
                assert_eq!(marker, "Umsatzübersicht");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scanner_skips_repeated_header_and_closes() {
        let m = marker();
        let mut scanner = SectionScanner::new(&m);
        assert!(!scanner.feed("Depot"));
        assert!(!scanner.feed("Umsatzübersicht"));
        assert!(scanner.feed("01.03.2023 Kauf"));
        assert!(!scanner.feed("UMSATZÜBERSICHT"));
        assert_eq!(scanner.state(), SectionState::Inside);
        assert!(!scanner.feed("Barmittelübersicht"));
        assert!(scanner.is_closed());
        assert!(!scanner.feed("01.04.2023 Kauf"));
    }

    #[test]
    fn test_locate_section_agrees_with_scanner() {
        let m = marker();
        let text = "Depot\nUmsatzübersicht\nline one\u{000C}UMSATZÜBERSICHT\nline two\nHinweise zum Kontoauszug\nline three";
        let body = locate_section(text, &m, "a.pdf").unwrap();
        assert_eq!(body, "line one\u{000C}UMSATZÜBERSICHT\nline two\n");

        let mut scanner = SectionScanner::new(&m);
        let fed: Vec<&str> = text
            .split(['\n', PAGE_BREAK])
            .filter(|line| scanner.feed(line))
            .collect();
        let located: Vec<&str> = body
            .split(['\n', PAGE_BREAK])
            .filter(|line| !line.is_empty() && !m.is_header(line))
            .collect();
        assert_eq!(fed, located);
    }
}
