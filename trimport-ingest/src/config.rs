//! Pipeline settings. Loaded from the `[pipeline]` table of the CLI config.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use trimport_core::{DedupScope, NumberFormat};

use crate::section::SectionMarker;
use crate::vocabulary::{Keyword, Vocabulary};

/// How a document's number format is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumberPolicy {
    /// Count money-shaped numbers of each format in the section.
    #[default]
    Auto,
    Continental,
    Anglo,
}

impl NumberPolicy {
    /// The format for a section, and whether it came from detection.
    /// `fallback` applies when detection sees neither format, or both equally.
    pub fn resolve(self, section_text: &str, fallback: NumberFormat) -> (NumberFormat, bool) {
        match self {
            NumberPolicy::Continental => (NumberFormat::Continental, false),
            NumberPolicy::Anglo => (NumberFormat::Anglo, false),
            NumberPolicy::Auto => match NumberFormat::detect(section_text) {
                Some(format) => (format, true),
                None => (fallback, false),
            },
        }
    }
}

impl FromStr for NumberPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(NumberPolicy::Auto);
        }
        match s.parse::<NumberFormat>() {
            Ok(NumberFormat::Continental) => Ok(NumberPolicy::Continental),
            Ok(NumberFormat::Anglo) => Ok(NumberPolicy::Anglo),
            Err(_) => Err(format!(
                "unknown number format '{s}' (expected auto, continental or anglo)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Header phrase opening the transactions section.
    pub section_marker: String,
    /// Headers of the sections that may follow it.
    pub section_boundaries: Vec<String>,
    /// Regexes (case-insensitive) for column titles and page furniture.
    pub noise_patterns: Vec<String>,
    pub number_format: NumberPolicy,
    /// Format assumed when `number_format = "auto"` cannot decide.
    pub number_format_fallback: NumberFormat,
    /// Used when an amount carries no currency of its own.
    pub default_currency: String,
    pub dedup_scope: DedupScope,
    /// Added to (or overriding) the standard vocabulary.
    pub extra_keywords: Vec<Keyword>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            section_marker: "Umsatzübersicht".to_string(),
            section_boundaries: vec![
                "Barmittelübersicht".to_string(),
                "Transaktionsübersicht".to_string(),
                "Hinweise zum Kontoauszug".to_string(),
                "Liquiditätsfonds".to_string(),
            ],
            noise_patterns: vec![
                r"^datum\b.*\b(saldo|betrag)\b".to_string(),
                r"^date\b.*\b(balance|amount)\b".to_string(),
                r"^(zahlungseingang|zahlungsausgang|saldo|typ|beschreibung)(\s+\S+){0,4}$".to_string(),
                r"^seite\s+\d+\s*(von|/)\s*\d+$".to_string(),
                r"^page\s+\d+\s*(of|/)\s*\d+$".to_string(),
                r"^\d+\s*/\s*\d+$".to_string(),
                r"trade republic bank gmbh".to_string(),
                r"^erstellt am\b".to_string(),
            ],
            number_format: NumberPolicy::default(),
            number_format_fallback: NumberFormat::Continental,
            default_currency: "EUR".to_string(),
            dedup_scope: DedupScope::default(),
            extra_keywords: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn section_marker(&self) -> SectionMarker {
        SectionMarker::new(&self.section_marker, &self.section_boundaries)
    }

    pub fn vocabulary(&self) -> Vocabulary {
        let mut vocabulary = Vocabulary::standard();
        vocabulary.extend(self.extra_keywords.iter().cloned());
        vocabulary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trimport_core::TxnKind;

    #[test]
    fn test_number_policy_from_str() {
        assert_eq!("auto".parse::<NumberPolicy>().unwrap(), NumberPolicy::Auto);
        assert_eq!("Anglo".parse::<NumberPolicy>().unwrap(), NumberPolicy::Anglo);
        assert!("metric".parse::<NumberPolicy>().is_err());
    }

    #[test]
    fn test_detect_falls_back_on_tie() {
        let policy = NumberPolicy::Auto;
        assert_eq!(
            policy.resolve("nothing to see", NumberFormat::Anglo),
            (NumberFormat::Anglo, false)
        );
        assert_eq!(
            policy.resolve("Kauf 950,00 EUR", NumberFormat::Anglo),
            (NumberFormat::Continental, true)
        );
        assert_eq!(
            NumberPolicy::Anglo.resolve("Kauf 950,00 EUR", NumberFormat::Continental),
            (NumberFormat::Anglo, false)
        );
    }

    #[test]
    fn test_extra_keywords_extend_vocabulary() {
        let cfg = PipelineConfig {
            extra_keywords: vec![Keyword::new("Kartenzahlung", TxnKind::Withdrawal)],
            ..PipelineConfig::default()
        };
        let v = cfg.vocabulary();
        assert_eq!(v.lookup("kartenzahlung").unwrap().kind, TxnKind::Withdrawal);
        assert!(v.lookup("Kauf").is_some());
    }

    #[test]
    fn test_toml_round_trip_with_partial_table() {
        let cfg: PipelineConfig = toml::from_str(
            r#"
section_marker = "Transactions"
dedup_scope = "global"
number_format = "anglo"
"#,
        )
        .unwrap();
        assert_eq!(cfg.section_marker, "Transactions");
        assert_eq!(cfg.dedup_scope, DedupScope::Global);
        assert_eq!(cfg.number_format, NumberPolicy::Anglo);
        assert_eq!(cfg.default_currency, "EUR");

        let rendered = toml::to_string(&PipelineConfig::default()).unwrap();
        let back: PipelineConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(back, PipelineConfig::default());
    }
}
