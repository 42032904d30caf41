//! Line classifier and field extractor.
//!
//! Works on one physical line at a time. Each recognized field is blanked out
//! of a working copy of the line before the next pattern runs, so dates are
//! never re-read as amounts and ISIN digits never as quantities. Whatever text
//! survives is the residual: keyword first, instrument name after.

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use std::ops::Range;
use std::sync::OnceLock;
use trimport_core::{Currency, Isin, NumberFormat};

use crate::error::{IngestError, LineIssue};
use crate::pages::PAGE_BREAK;
use crate::types::{DateField, LineClass, LineFields, ParsedAmount, Sign};
use crate::vocabulary::Vocabulary;

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})([./])(\d{1,2})[./](\d{4})\b").expect("date regex")
    })
}

fn isin_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]{2}[A-Z0-9]{9}[0-9]\b").expect("isin regex"))
}

fn quantity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d[\d.,]*)\s?(?:stk\b\.?|stück\b|st\.)").expect("quantity regex")
    })
}

fn bare_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(?:[.,]\d+)*$").expect("bare number regex"))
}

/// Anything money-shaped in either format; what the strict pattern leaves behind is malformed.
fn loose_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[-+]?\b\d[\d.,]*[.,]\d{2}\b(?:\s?(?:EUR|USD|CHF|GBP)\b|\s?[€$£])?")
            .expect("loose amount regex")
    })
}

fn blank(work: &mut String, range: Range<usize>) {
    let spaces = " ".repeat(range.len());
    work.replace_range(range, &spaces);
}

pub struct Classifier {
    format: NumberFormat,
    amount_re: Regex,
    noise: Vec<Regex>,
    vocabulary: Vocabulary,
}

impl Classifier {
    pub fn new<S: AsRef<str>>(
        format: NumberFormat,
        vocabulary: Vocabulary,
        noise_patterns: &[S],
    ) -> Result<Self, IngestError> {
        let amount_re = Regex::new(&format!(
            r"(?P<sign>[-+−])?(?:(?P<lead>[€$£])\s?)?\b(?P<num>{})\b(?:\s?(?P<cur>(?:EUR|USD|CHF|GBP)\b|[€$£]))?",
            format.amount_pattern()
        ))?;

        let noise = noise_patterns
            .iter()
            .map(|p| RegexBuilder::new(p.as_ref()).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            format,
            amount_re,
            noise,
            vocabulary,
        })
    }

    pub fn format(&self) -> NumberFormat {
        self.format
    }

    /// `dd.mm.yyyy` always; `mm/dd/yyyy` when the document uses anglo numbers.
    fn parse_date(&self, first: &str, sep: &str, second: &str, year: &str) -> Option<NaiveDate> {
        let (first, second, year) = (
            first.parse::<u32>().ok()?,
            second.parse::<u32>().ok()?,
            year.parse::<i32>().ok()?,
        );
        let (day, month) = match (sep, self.format) {
            ("/", NumberFormat::Anglo) => (second, first),
            _ => (first, second),
        };
        NaiveDate::from_ymd_opt(year, month, day)
    }

    pub fn classify(&self, line: &str) -> LineClass {
        let line = line.trim_matches(|c: char| c.is_whitespace() || c == PAGE_BREAK);
        if line.is_empty() || self.noise.iter().any(|re| re.is_match(line)) {
            return LineClass::Noise;
        }

        let mut work = line.to_string();
        let mut fields = LineFields::default();

        // Only the first date can date the line; value dates are masked with it.
        let mut first_date: Option<(bool, DateField)> = None;
        for caps in date_re().captures_iter(line) {
            let Some(whole) = caps.get(0) else { continue };
            if first_date.is_none() {
                let leading = line[..whole.start()].trim().is_empty();
                let date = match self.parse_date(&caps[1], &caps[2], &caps[3], &caps[4]) {
                    Some(d) => DateField::Valid(d),
                    None => DateField::Malformed(whole.as_str().to_string()),
                };
                first_date = Some((leading, date));
            }
            blank(&mut work, whole.range());
        }

        let isins: Vec<(Range<usize>, Isin)> = isin_re()
            .find_iter(&work)
            .filter_map(|m| Isin::parse(m.as_str()).ok().map(|isin| (m.range(), isin)))
            .collect();
        fields.isin = isins
            .iter()
            .find(|(_, isin)| isin.has_valid_check_digit())
            .or_else(|| isins.first())
            .map(|(_, isin)| isin.clone());
        for (range, _) in isins {
            blank(&mut work, range);
        }

        if let Some(caps) = quantity_re().captures(&work) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            fields.quantity = self.format.parse(&caps[1]).ok();
            blank(&mut work, whole);
        }

        // Malformed amounts keep their slot so the first and last stay in place.
        let mut slots: Vec<(usize, Option<ParsedAmount>)> = Vec::new();
        let snapshot = work.clone();
        for caps in self.amount_re.captures_iter(&snapshot) {
            let Some(whole) = caps.get(0) else { continue };
            blank(&mut work, whole.range());
            let value = match self.format.parse(&caps["num"]) {
                Ok(value) => value,
                Err(_) => {
                    let raw = whole.as_str().trim().to_string();
                    fields.issues.push(LineIssue::MalformedAmount(raw));
                    slots.push((whole.start(), None));
                    continue;
                }
            };
            let sign = caps.name("sign").map(|m| match m.as_str() {
                "+" => Sign::Plus,
                _ => Sign::Minus,
            });
            let currency = caps
                .name("cur")
                .or_else(|| caps.name("lead"))
                .and_then(|m| Currency::parse(m.as_str()).ok());
            let amount = ParsedAmount {
                value: value.abs(),
                sign,
                currency,
            };
            slots.push((whole.start(), Some(amount)));
        }
        for range in collect_ranges(loose_amount_re(), &work) {
            fields
                .issues
                .push(LineIssue::MalformedAmount(work[range.clone()].trim().to_string()));
            slots.push((range.start, None));
            blank(&mut work, range);
        }
        slots.sort_by_key(|(start, _)| *start);
        fields.amounts = slots.into_iter().map(|(_, amount)| amount).collect();

        let mut tokens: Vec<&str> = work
            .split_whitespace()
            .filter(|t| t.chars().any(char::is_alphanumeric))
            .collect();

        if let Some(keyword) = tokens.first().and_then(|t| self.vocabulary.lookup(t)) {
            fields.keyword = Some(keyword.clone());
            fields.keyword_token = Some(tokens.remove(0).to_string());
        }

        if fields.isin.is_some() && fields.quantity.is_none() {
            if let Some(pos) = tokens.iter().position(|t| bare_number_re().is_match(t)) {
                if let Ok(q) = self.format.parse(tokens[pos]) {
                    fields.quantity = Some(q);
                    tokens.remove(pos);
                }
            }
        }

        if !tokens.is_empty() {
            fields.text = Some(tokens.join(" "));
        }

        // A date further into the line only counts next to a type or an amount.
        if let Some((leading, date)) = first_date {
            if leading || fields.keyword.is_some() || !fields.amounts.is_empty() {
                if let DateField::Malformed(raw) = &date {
                    fields.issues.insert(0, LineIssue::MalformedDate(raw.clone()));
                }
                fields.date = Some(date);
            }
        }

        let recognized = fields.date.is_some()
            || fields.keyword.is_some()
            || fields.isin.is_some()
            || fields.quantity.is_some()
            || !fields.amounts.is_empty()
            || !fields.issues.is_empty();
        if recognized {
            return LineClass::Fields(fields);
        }
        match fields.text {
            Some(text) => LineClass::Text(text),
            None => LineClass::Noise,
        }
    }
}

fn collect_ranges(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.range()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use rust_decimal::Decimal;
    use trimport_core::TxnKind;

    fn classifier(format: NumberFormat) -> Classifier {
        let cfg = PipelineConfig::default();
        Classifier::new(format, cfg.vocabulary(), &cfg.noise_patterns).unwrap()
    }

    fn fields(class: LineClass) -> LineFields {
        match class {
            LineClass::Fields(f) => f,
            other => panic!("expected fields, got {other:?}"),
        }
    }

    fn amount(f: &LineFields, i: usize) -> &ParsedAmount {
        f.amounts[i].as_ref().unwrap()
    }

    #[test]
    fn test_full_trade_line() {
        let c = classifier(NumberFormat::Continental);
        let f = fields(c.classify("01.03.2023 Kauf DE0007164600 SAP SE 10 Stk 950,00 EUR — 12.345,67"));

        assert_eq!(
            f.date,
            Some(DateField::Valid(NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()))
        );
        assert_eq!(f.keyword.as_ref().unwrap().label, "Kauf");
        assert_eq!(f.keyword.as_ref().unwrap().kind, TxnKind::Buy);
        assert_eq!(f.isin.as_ref().unwrap().as_str(), "DE0007164600");
        assert_eq!(f.quantity, Some(Decimal::from(10)));
        assert_eq!(f.text.as_deref(), Some("SAP SE"));
        assert_eq!(f.amounts.len(), 2);
        assert_eq!(amount(&f, 0).value, Decimal::new(95000, 2));
        assert_eq!(amount(&f, 0).currency, Some(Currency::eur()));
        assert_eq!(amount(&f, 0).sign, None);
        assert_eq!(amount(&f, 1).value, Decimal::new(1234567, 2));
        assert!(f.issues.is_empty());
    }

    #[test]
    fn test_name_before_isin_and_bare_quantity() {
        let c = classifier(NumberFormat::Continental);
        let f = fields(c.classify("01.02.2024 Kauf Example AG DE0001234567 10 1.234,56 5.000,00"));
        assert_eq!(f.text.as_deref(), Some("Example AG"));
        assert_eq!(f.quantity, Some(Decimal::from(10)));
        assert_eq!(f.amounts.len(), 2);
    }

    #[test]
    fn test_signed_amount_with_leading_symbol() {
        let c = classifier(NumberFormat::Anglo);
        let f = fields(c.classify("03/15/2023 Withdrawal -$1,200.00 3,400.10"));
        assert_eq!(f.keyword.as_ref().unwrap().kind, TxnKind::Withdrawal);
        assert_eq!(
            f.date,
            Some(DateField::Valid(NaiveDate::from_ymd_opt(2023, 3, 15).unwrap()))
        );
        assert_eq!(amount(&f, 0).sign, Some(Sign::Minus));
        assert_eq!(amount(&f, 0).currency.as_ref().unwrap().as_str(), "USD");
        assert_eq!(amount(&f, 0).value, Decimal::new(120000, 2));
        assert_eq!(amount(&f, 1).value, Decimal::new(340010, 2));
    }

    #[test]
    fn test_unknown_keyword_stays_in_text() {
        let c = classifier(NumberFormat::Continental);
        let f = fields(c.classify("05.03.2023 Lastschrift Stadtwerke 45,10 EUR"));
        assert!(f.keyword.is_none());
        assert_eq!(f.text.as_deref(), Some("Lastschrift Stadtwerke"));
    }

    #[test]
    fn test_malformed_date_is_reported() {
        let c = classifier(NumberFormat::Continental);
        let f = fields(c.classify("31.02.2023 Kauf 1,00 EUR"));
        assert_eq!(f.date, Some(DateField::Malformed("31.02.2023".into())));
        assert_eq!(f.issues, vec![LineIssue::MalformedDate("31.02.2023".into())]);
    }

    #[test]
    fn test_foreign_amount_is_malformed() {
        let c = classifier(NumberFormat::Continental);
        let f = fields(c.classify("05.03.2023 Zinsen 1,234.56"));
        assert_eq!(f.amounts, vec![None]);
        assert_eq!(f.issues, vec![LineIssue::MalformedAmount("1,234.56".into())]);
    }

    #[test]
    fn test_plain_text_and_noise() {
        let c = classifier(NumberFormat::Continental);
        assert_eq!(c.classify("UCITS ETF (Dist)"), LineClass::Text("UCITS ETF (Dist)".into()));
        assert_eq!(c.classify("   "), LineClass::Noise);
        assert_eq!(c.classify("Seite 2 von 5"), LineClass::Noise);
        assert_eq!(
            c.classify("DATUM TYP BESCHREIBUNG ZAHLUNGSEINGANG ZAHLUNGSAUSGANG SALDO"),
            LineClass::Noise
        );
        assert_eq!(c.classify("— —"), LineClass::Noise);
    }

    #[test]
    fn test_continuation_with_amounts_only() {
        let c = classifier(NumberFormat::Continental);
        let f = fields(c.classify("950,00 € 12.345,67 €"));
        assert!(f.date.is_none());
        assert_eq!(f.amounts.len(), 2);
        assert_eq!(amount(&f, 0).currency, Some(Currency::eur()));
        assert!(f.text.is_none());
    }

    #[test]
    fn test_malformed_amount_keeps_its_position() {
        let c = classifier(NumberFormat::Continental);
        let f = fields(c.classify("01.03.2023 Kauf DE0007164600 SAP SE 10 Stk 950.00 EUR — 12.345,67"));
        assert_eq!(f.amounts.len(), 2);
        assert!(f.amounts[0].is_none());
        assert_eq!(amount(&f, 1).value, Decimal::new(1234567, 2));
        assert_eq!(f.text.as_deref(), Some("SAP SE"));
        assert_eq!(f.issues, vec![LineIssue::MalformedAmount("950.00 EUR".into())]);
    }

    #[test]
    fn test_spaced_dash_is_a_separator_not_a_sign() {
        let c = classifier(NumberFormat::Continental);
        let f = fields(c.classify("01.03.2023 Verkauf DE0007164600 SAP SE 10 Stk 950,00 EUR - 12.345,67"));
        assert_eq!(amount(&f, 0).sign, None);
        assert_eq!(amount(&f, 1).sign, None);
        assert_eq!(amount(&f, 1).signed_value(), Decimal::new(1234567, 2));

        let f = fields(c.classify("05.03.2023 Lastschrift −45,10 954,90"));
        assert_eq!(amount(&f, 0).sign, Some(Sign::Minus));
    }

    #[test]
    fn test_date_inside_line_dates_a_typed_line() {
        let c = classifier(NumberFormat::Continental);
        let f = fields(c.classify("Zinsen 02.03.2023 0,12 100,12"));
        assert_eq!(
            f.date,
            Some(DateField::Valid(NaiveDate::from_ymd_opt(2023, 3, 2).unwrap()))
        );
        assert_eq!(f.keyword.as_ref().unwrap().kind, TxnKind::Interest);
        assert!(f.starts_transaction());

        // Value date on a wrapped name line stays masked.
        assert_eq!(c.classify("Valuta 02.03.2023"), LineClass::Text("Valuta".into()));
        let f = fields(c.classify("01.03.2023 Kauf Valuta 03.03.2023 1,00"));
        assert_eq!(
            f.date,
            Some(DateField::Valid(NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()))
        );
        assert_eq!(f.text.as_deref(), Some("Valuta"));
    }
}
