//! Chef command parsing
//!
//! A command is "commande <n> lancée" (start preparing order n) or
//! "commande <n> prête" (order n is ready). Transcriptions are noisy, so the
//! heard text is compared against a few canonical spellings of each command
//! and the closest one wins if it clears the threshold.

use serde::Serialize;

use super::numbers::{OrderNumber, extract_order_number};
use super::similarity::similarity;

/// Default minimum score for a phrase to count as a command
pub const DEFAULT_INTENT_THRESHOLD: u8 = 70;

/// Spellings a transcription engine commonly produces for "launched"
const LAUNCH_VARIANTS: &[&str] = &["lance", "lancé", "lancée"];

/// Spellings a transcription engine commonly produces for "ready"
const READY_VARIANTS: &[&str] = &["prete", "prête", "prêt"];

/// What the chef asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    /// Start preparing the order
    Launch,
    /// The order is ready to serve
    Ready,
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launch => write!(f, "launch"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// A scored command candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intent {
    /// Command kind
    pub kind: IntentKind,
    /// Order number, digits only
    pub order_number: String,
    /// Similarity (0-100) between the heard text and `matched_template`
    pub confidence: u8,
    /// Canonical phrase that matched best
    pub matched_template: String,
}

/// Score of the heard text against one canonical phrase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateScore {
    /// Canonical phrase
    pub template: String,
    /// Similarity with the heard text
    pub score: u8,
}

/// Full scoring trace of one parse
#[derive(Debug, Clone, Serialize)]
pub struct ParseReport {
    /// Normalized text that was scored
    pub text: String,
    /// Order number, if one was found
    pub order_number: Option<String>,
    /// Scores against each "launched" phrase
    pub launch_scores: Vec<TemplateScore>,
    /// Scores against each "ready" phrase
    pub ready_scores: Vec<TemplateScore>,
    /// Threshold in effect
    pub threshold: u8,
    /// Outcome
    pub intent: Option<Intent>,
}

/// Parses transcriptions into intents
#[derive(Debug, Clone, Copy)]
pub struct IntentParser {
    threshold: u8,
}

impl Default for IntentParser {
    fn default() -> Self {
        Self::new(DEFAULT_INTENT_THRESHOLD)
    }
}

impl IntentParser {
    /// Create a parser with the given acceptance threshold (0-100)
    #[must_use]
    pub const fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    /// Acceptance threshold
    #[must_use]
    pub const fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Parse a transcription into an intent
    ///
    /// Returns `None` when no order number is found or no phrase is close
    /// enough. That is the normal outcome for chatter.
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<Intent> {
        self.report(text).intent
    }

    /// Parse and keep every intermediate score
    #[must_use]
    pub fn report(&self, text: &str) -> ParseReport {
        let text = text.trim().to_lowercase();

        let Some(number) = extract_order_number(&text) else {
            tracing::debug!(text = %text, "no order number in transcription");
            return ParseReport {
                text,
                order_number: None,
                launch_scores: Vec::new(),
                ready_scores: Vec::new(),
                threshold: self.threshold,
                intent: None,
            };
        };

        tracing::debug!(text = %text, order = %number.canonical, source = ?number.source, "order number found");

        let launch_scores = score_templates(&text, &number, LAUNCH_VARIANTS);
        let ready_scores = score_templates(&text, &number, READY_VARIANTS);

        let intent = decide(
            best(&launch_scores),
            best(&ready_scores),
            self.threshold,
        )
        .map(|(kind, winner)| Intent {
            kind,
            order_number: number.canonical.clone(),
            confidence: winner.score,
            matched_template: winner.template.clone(),
        });

        match &intent {
            Some(i) => tracing::debug!(
                kind = %i.kind,
                order = %i.order_number,
                confidence = i.confidence,
                template = %i.matched_template,
                "phrase accepted"
            ),
            None => tracing::debug!(
                best_launch = best(&launch_scores).map_or(0, |s| s.score),
                best_ready = best(&ready_scores).map_or(0, |s| s.score),
                threshold = self.threshold,
                "phrase rejected, similarity too low"
            ),
        }

        ParseReport {
            text,
            order_number: Some(number.canonical),
            launch_scores,
            ready_scores,
            threshold: self.threshold,
            intent,
        }
    }
}

/// Parse with the default threshold
#[must_use]
pub fn parse(text: &str) -> Option<Intent> {
    IntentParser::default().parse(text)
}

fn score_templates(text: &str, number: &OrderNumber, variants: &[&str]) -> Vec<TemplateScore> {
    variants
        .iter()
        .map(|variant| {
            let template = format!("commande {} {variant}", number.spoken);
            let score = similarity(text, &template);
            TemplateScore { template, score }
        })
        .collect()
}

/// First template with the highest score
fn best(scores: &[TemplateScore]) -> Option<&TemplateScore> {
    scores
        .iter()
        .fold(None, |acc: Option<&TemplateScore>, s| match acc {
            Some(b) if b.score >= s.score => Some(b),
            _ => Some(s),
        })
}

/// Pick the winning kind; Launch wins ties with Ready
fn decide<'a>(
    launch: Option<&'a TemplateScore>,
    ready: Option<&'a TemplateScore>,
    threshold: u8,
) -> Option<(IntentKind, &'a TemplateScore)> {
    let launch_score = launch.map_or(0, |s| s.score);
    let ready_score = ready.map_or(0, |s| s.score);

    if let Some(l) = launch.filter(|_| launch_score >= threshold && launch_score >= ready_score) {
        return Some((IntentKind::Launch, l));
    }

    ready
        .filter(|_| ready_score >= threshold)
        .map(|r| (IntentKind::Ready, r))
}
