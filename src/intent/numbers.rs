//! Order number extraction
//!
//! Transcription engines write order numbers either as digits ("commande 7")
//! or spelled out ("commande sept"). Digits win when both are present.

use std::sync::LazyLock;

use regex::Regex;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new("[0-9]+").expect("valid regex"));

/// French number words recognized as order numbers
///
/// Spelled-out numbers above twenty are not recognized.
const NUMBER_WORDS: &[(&str, u8)] = &[
    ("un", 1),
    ("une", 1),
    ("deux", 2),
    ("trois", 3),
    ("quatre", 4),
    ("cinq", 5),
    ("six", 6),
    ("sept", 7),
    ("huit", 8),
    ("neuf", 9),
    ("dix", 10),
    ("onze", 11),
    ("douze", 12),
    ("treize", 13),
    ("quatorze", 14),
    ("quinze", 15),
    ("seize", 16),
    ("dix-sept", 17),
    ("dix-huit", 18),
    ("dix-neuf", 19),
    ("vingt", 20),
];

/// Where an order number was found in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberSource {
    /// A run of decimal digits, as written in the text
    Digits(String),
    /// A spelled-out number word
    Word(String),
}

/// An order number pulled out of a transcription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderNumber {
    /// Canonical digits (no leading zeros)
    pub canonical: String,
    /// Digits used to build the phrase templates
    ///
    /// Equal to the digits as heard, so "commande 07" is compared against
    /// "commande 07 ..." rather than "commande 7 ...".
    pub spoken: String,
    /// How the number was found
    pub source: NumberSource,
}

/// Find the order number in already-normalized text
///
/// Only the first run of digits is used. Without digits, the first number
/// word in reading order is used.
#[must_use]
pub fn extract_order_number(text: &str) -> Option<OrderNumber> {
    if let Some(m) = DIGITS.find(text) {
        let digits = m.as_str();
        return Some(OrderNumber {
            canonical: canonicalize(digits),
            spoken: digits.to_string(),
            source: NumberSource::Digits(digits.to_string()),
        });
    }

    let (word, value) = find_number_word(text)?;
    let digits = value.to_string();
    Some(OrderNumber {
        canonical: digits.clone(),
        spoken: digits,
        source: NumberSource::Word(word),
    })
}

/// Strip leading zeros, keeping a lone "0"
fn canonicalize(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn find_number_word(text: &str) -> Option<(String, u8)> {
    let tokens: Vec<&str> = text
        .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .filter(|t| !t.is_empty())
        .collect();

    for (i, token) in tokens.iter().enumerate() {
        // "dix sept" written as two words
        if *token == "dix" {
            if let Some(next) = tokens.get(i + 1) {
                let compound = format!("dix-{next}");
                if let Some(value) = lookup(&compound) {
                    return Some((compound, value));
                }
            }
        }

        if let Some(value) = lookup(token) {
            return Some(((*token).to_string(), value));
        }
    }

    None
}

fn lookup(word: &str) -> Option<u8> {
    NUMBER_WORDS
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, value)| *value)
}
