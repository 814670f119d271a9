//! Structured decision records
//!
//! The session controller emits one [`SessionEvent`] per decision it takes
//! (what it heard, why it rejected something, what it dispatched). Sinks
//! turn those records into log lines, JSON lines, or an in-memory list.

use std::io::Write;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::confirm::ConfirmationResult;
use crate::intent::Intent;
use crate::{Error, Result};

/// Which capture produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStage {
    /// Listening for a command
    Command,
    /// Waiting for a yes/no answer
    Confirmation,
}

/// A decision taken by the session controller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Controller left idle and started listening
    Started,
    /// Buffer under the silence floor, not transcribed
    Silence {
        stage: CaptureStage,
        peak: f32,
    },
    /// Capture device or transcriber failed
    CaptureFailed {
        stage: CaptureStage,
        error: String,
    },
    /// Transcription was effectively empty
    TooShort {
        stage: CaptureStage,
        text: String,
    },
    /// Speech without a recognizable command
    NoCommand {
        text: String,
    },
    /// Command recognized and accepted for confirmation
    IntentDetected {
        text: String,
        intent: Intent,
    },
    /// Command recognized but discarded, previous dispatch too recent
    CooldownActive {
        intent: Intent,
        remaining_ms: u64,
    },
    /// Chef asked to confirm
    ConfirmationRequested {
        intent: Intent,
    },
    /// Answer classified
    ConfirmationResolved {
        intent: Intent,
        result: ConfirmationResult,
        response: Option<String>,
    },
    /// Command handed to the action sink
    Dispatched {
        intent: Intent,
    },
    /// Action sink reported a failure; not retried
    DispatchFailed {
        intent: Intent,
        error: String,
    },
    /// Controller stopped
    Shutdown,
}

/// Receives session events
pub trait EventSink {
    /// Record one event
    fn emit(&self, event: &SessionEvent);
}

impl<E: EventSink + ?Sized> EventSink for Box<E> {
    fn emit(&self, event: &SessionEvent) {
        (**self).emit(event);
    }
}

/// Writes each event as a structured `tracing` record
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn emit(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Started => tracing::info!("listening for commands"),
            SessionEvent::Silence { stage, peak } => {
                tracing::trace!(?stage, peak, "silence");
            }
            SessionEvent::CaptureFailed { stage, error } => {
                tracing::warn!(?stage, error = %error, "capture failed");
            }
            SessionEvent::TooShort { stage, text } => {
                tracing::debug!(?stage, text = %text, "transcription too short");
            }
            SessionEvent::NoCommand { text } => {
                tracing::info!(text = %text, "no command detected");
            }
            SessionEvent::IntentDetected { text, intent } => tracing::info!(
                text = %text,
                kind = %intent.kind,
                order = %intent.order_number,
                confidence = intent.confidence,
                template = %intent.matched_template,
                "command detected"
            ),
            SessionEvent::CooldownActive {
                intent,
                remaining_ms,
            } => tracing::info!(
                kind = %intent.kind,
                order = %intent.order_number,
                remaining_ms,
                "command ignored, cooldown active"
            ),
            SessionEvent::ConfirmationRequested { intent } => tracing::info!(
                kind = %intent.kind,
                order = %intent.order_number,
                "awaiting confirmation (oui / non)"
            ),
            SessionEvent::ConfirmationResolved {
                intent,
                result,
                response,
            } => tracing::info!(
                kind = %intent.kind,
                order = %intent.order_number,
                %result,
                response = response.as_deref().unwrap_or(""),
                "confirmation resolved"
            ),
            SessionEvent::Dispatched { intent } => tracing::info!(
                kind = %intent.kind,
                order = %intent.order_number,
                "command dispatched"
            ),
            SessionEvent::DispatchFailed { intent, error } => tracing::error!(
                kind = %intent.kind,
                order = %intent.order_number,
                error = %error,
                "dispatch failed"
            ),
            SessionEvent::Shutdown => tracing::info!("listening stopped"),
        }
    }
}

/// Writes one JSON object per event, stamped with UTC time
pub struct JsonLinesEvents {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesEvents {
    /// Write to any writer
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Write to stdout
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

/// Line layout of [`JsonLinesEvents`]
#[derive(Serialize)]
struct Stamped<'a> {
    at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    event: &'a SessionEvent,
}

impl JsonLinesEvents {
    /// Serialize and write one stamped line
    fn write_line(&self, event: &SessionEvent) -> Result<()> {
        let line = serde_json::to_string(&Stamped {
            at: chrono::Utc::now(),
            event,
        })?;

        let mut out = self
            .out
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("event writer poisoned")))?;

        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

impl EventSink for JsonLinesEvents {
    fn emit(&self, event: &SessionEvent) {
        if let Err(e) = self.write_line(event) {
            tracing::warn!(error = %e, "failed to write event");
        }
    }
}

/// Keeps events in memory
///
/// Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct RecordingEvents {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl RecordingEvents {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Forget recorded events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for RecordingEvents {
    fn emit(&self, event: &SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
