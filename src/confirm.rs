//! Spoken confirmation classification
//!
//! After a command is detected the chef is asked to confirm it. The answer
//! is compared against affirmative and negative word lists; anything that is
//! not clearly affirmative must not trigger the command.

use serde::Serialize;

use crate::intent::similarity;

/// Default minimum score for a confirmation word to count
pub const DEFAULT_CONFIRM_THRESHOLD: u8 = 60;

const AFFIRMATIVE_WORDS: &[&str] = &[
    "oui", "yes", "ok", "okay", "confirme", "confirmé", "correct", "exacte",
];

const NEGATIVE_WORDS: &[&str] = &["non", "no", "pas", "annule", "faux", "incorrect"];

/// Outcome of a confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationResult {
    /// The chef confirmed
    Affirmed,
    /// The chef declined
    Declined,
    /// Nothing usable was heard
    Unclear,
}

impl ConfirmationResult {
    /// Only an explicit affirmation allows the command to proceed
    #[must_use]
    pub const fn is_affirmed(self) -> bool {
        matches!(self, Self::Affirmed)
    }
}

impl std::fmt::Display for ConfirmationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Affirmed => write!(f, "affirmed"),
            Self::Declined => write!(f, "declined"),
            Self::Unclear => write!(f, "unclear"),
        }
    }
}

/// Scores behind a classification
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationReport {
    /// Normalized response text
    pub text: String,
    /// Best score against the affirmative words
    pub best_affirmative: u8,
    /// Best score against the negative words
    pub best_negative: u8,
    /// Outcome
    pub result: ConfirmationResult,
}

/// Classifies spoken responses
#[derive(Debug, Clone)]
pub struct ConfirmationGate {
    affirmative: Vec<String>,
    negative: Vec<String>,
    threshold: u8,
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRM_THRESHOLD)
    }
}

impl ConfirmationGate {
    /// Create a gate with the built-in word lists
    #[must_use]
    pub fn new(threshold: u8) -> Self {
        Self::with_words(
            AFFIRMATIVE_WORDS.iter().map(ToString::to_string).collect(),
            NEGATIVE_WORDS.iter().map(ToString::to_string).collect(),
            threshold,
        )
    }

    /// Create a gate with custom word lists
    #[must_use]
    pub fn with_words(affirmative: Vec<String>, negative: Vec<String>, threshold: u8) -> Self {
        let normalize = |words: Vec<String>| -> Vec<String> {
            words
                .into_iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };

        Self {
            affirmative: normalize(affirmative),
            negative: normalize(negative),
            threshold,
        }
    }

    /// Classify a response
    #[must_use]
    pub fn classify(&self, response: &str) -> ConfirmationResult {
        self.report(response).result
    }

    /// Classify a response and keep the scores
    ///
    /// The whole response and each of its words are compared against every
    /// word of a list; the best single score represents the list.
    #[must_use]
    pub fn report(&self, response: &str) -> ConfirmationReport {
        let text = response.trim().to_lowercase();

        let mut candidates: Vec<&str> = vec![text.as_str()];
        candidates.extend(
            text.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
                .filter(|t| !t.is_empty()),
        );

        let best_affirmative = best_score(&candidates, &self.affirmative);
        let best_negative = best_score(&candidates, &self.negative);

        let result = if best_affirmative >= self.threshold && best_affirmative > best_negative {
            ConfirmationResult::Affirmed
        } else if best_negative >= self.threshold {
            ConfirmationResult::Declined
        } else {
            ConfirmationResult::Unclear
        };

        tracing::debug!(
            text = %text,
            best_affirmative,
            best_negative,
            %result,
            "confirmation classified"
        );

        ConfirmationReport {
            text,
            best_affirmative,
            best_negative,
            result,
        }
    }
}

/// Classify with the built-in words and default threshold
#[must_use]
pub fn confirm(response: &str) -> ConfirmationResult {
    ConfirmationGate::default().classify(response)
}

fn best_score(candidates: &[&str], words: &[String]) -> u8 {
    candidates
        .iter()
        .flat_map(|c| words.iter().map(move |w| similarity(c, w)))
        .max()
        .unwrap_or(0)
}
