//! Turning transcriptions into kitchen commands
//!
//! Pure functions only: similarity scoring, order number extraction and
//! phrase-template matching.

mod numbers;
mod parser;
mod similarity;

pub use numbers::{NumberSource, OrderNumber, extract_order_number};
pub use parser::{
    DEFAULT_INTENT_THRESHOLD, Intent, IntentKind, IntentParser, ParseReport, TemplateScore, parse,
};
pub use similarity::similarity;
