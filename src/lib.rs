//! Brigade - voice commands for the kitchen pass
//!
//! Listens for spoken order commands ("commande 12 lancée", "commande 12
//! prête"), asks for a spoken confirmation and hands confirmed commands to an
//! action sink.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   samples   ┌──────────────┐   text   ┌──────────────┐
//! │ AudioSource  │ ──────────► │ Transcriber  │ ───────► │ IntentParser │
//! └──────────────┘             └──────────────┘          └──────┬───────┘
//!                                                               │ Intent
//! ┌──────────────┐  confirmed  ┌──────────────────┐             │
//! │  ActionSink  │ ◄────────── │ ConfirmationGate │ ◄───────────┘
//! └──────────────┘             └──────────────────┘
//!         SessionController: cycle, cooldown, shutdown
//! ```
//!
//! Scoring and parsing are pure functions; the [`SessionController`] is the
//! only stateful component.

pub mod clock;
pub mod config;
pub mod confirm;
pub mod daemon;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod intent;
pub mod session;
pub mod voice;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use confirm::{ConfirmationGate, ConfirmationResult, confirm};
pub use daemon::Daemon;
pub use dispatch::{ActionSink, ConsoleSink, WebhookSink};
pub use error::{Error, Result};
pub use events::{EventSink, RecordingEvents, SessionEvent};
pub use intent::{Intent, IntentKind, IntentParser, parse, similarity};
pub use session::{SessionController, SessionPhase, SessionSettings, SessionState};
