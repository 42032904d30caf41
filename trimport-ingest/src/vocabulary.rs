//! Transaction-type keywords recognized at the start of a statement line.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trimport_core::TxnKind;

use crate::section::fold;

/// A recognized keyword: its canonical spelling and what it means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub label: String,
    pub kind: TxnKind,
}

impl Keyword {
    pub fn new(label: impl Into<String>, kind: TxnKind) -> Self {
        Self {
            label: label.into(),
            kind,
        }
    }
}

/// Keyword lookup, insensitive to case, umlaut spelling and trailing punctuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Keyword>", into = "Vec<Keyword>")]
pub struct Vocabulary {
    entries: Vec<Keyword>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Type recorded for dated lines whose leading token is not a keyword.
    pub const FALLBACK_LABEL: &'static str = "Sonstiges";

    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// German and English labels seen on neo-broker account statements.
    pub fn standard() -> Self {
        [
            ("Kauf", TxnKind::Buy),
            ("Buy", TxnKind::Buy),
            ("Sparplan", TxnKind::Buy),
            ("Sparplanausführung", TxnKind::Buy),
            ("Verkauf", TxnKind::Sell),
            ("Sell", TxnKind::Sell),
            ("Dividende", TxnKind::Dividend),
            ("Ausschüttung", TxnKind::Dividend),
            ("Dividend", TxnKind::Dividend),
            ("Zinsen", TxnKind::Interest),
            ("Zinszahlung", TxnKind::Interest),
            ("Interest", TxnKind::Interest),
            ("Gebühr", TxnKind::Fee),
            ("Fee", TxnKind::Fee),
            ("Steuer", TxnKind::Tax),
            ("Steuern", TxnKind::Tax),
            ("Tax", TxnKind::Tax),
            ("Einzahlung", TxnKind::Deposit),
            ("Deposit", TxnKind::Deposit),
            ("Auszahlung", TxnKind::Withdrawal),
            ("Withdrawal", TxnKind::Withdrawal),
            ("Überweisung", TxnKind::Transfer),
            ("Übertrag", TxnKind::Transfer),
            ("Transfer", TxnKind::Transfer),
        ]
        .into_iter()
        .map(|(label, kind)| Keyword::new(label, kind))
        .collect::<Vec<_>>()
        .into()
    }

    /// Add or replace a keyword. A later entry with the same folded form wins.
    pub fn insert(&mut self, keyword: Keyword) {
        let key = fold(&keyword.label);
        if key.is_empty() {
            return;
        }
        match self.index.get(&key) {
            Some(&i) => self.entries[i] = keyword,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(keyword);
            }
        }
    }

    pub fn extend<I: IntoIterator<Item = Keyword>>(&mut self, keywords: I) {
        for keyword in keywords {
            self.insert(keyword);
        }
    }

    pub fn lookup(&self, token: &str) -> Option<&Keyword> {
        let key = fold(token);
        self.index.get(&key).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::standard()
    }
}

impl From<Vec<Keyword>> for Vocabulary {
    fn from(entries: Vec<Keyword>) -> Self {
        let mut vocabulary = Vocabulary::new();
        vocabulary.extend(entries);
        vocabulary
    }
}

impl From<Vocabulary> for Vec<Keyword> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.entries
    }
}
