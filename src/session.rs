//! Listen → detect → confirm → dispatch cycle
//!
//! [`SessionController`] is an explicit state machine driven by [`step`],
//! one transition per call:
//!
//! ```text
//! Idle ─► Listening ─► Detected ─► Confirming ─► Dispatching ─┐
//!            ▲  │                      │                       │
//!            │  └── nothing / cooldown │ declined / unclear    │
//!            └─────────────────────────┴───────────────────────┘
//! ```
//!
//! Any phase moves to `Shutdown` on [`shutdown`]. The cooldown timestamp in
//! [`SessionState`] is only written after a successful dispatch.
//!
//! [`step`]: SessionController::step
//! [`shutdown`]: SessionController::shutdown

use std::future::Future;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::confirm::{ConfirmationGate, ConfirmationResult};
use crate::dispatch::ActionSink;
use crate::events::{CaptureStage, EventSink, SessionEvent, TracingEvents};
use crate::intent::{Intent, IntentParser};
use crate::voice::{AudioSource, Heard, ListenSettings, Transcriber, hear};

/// Default minimum time between two dispatched commands
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

/// Default length of a command capture window
pub const DEFAULT_LISTEN_WINDOW: Duration = Duration::from_secs(3);

/// Default length of a confirmation capture window
pub const DEFAULT_CONFIRM_WINDOW: Duration = Duration::from_secs(3);

/// Default pause between two cycles
pub const DEFAULT_CYCLE_PAUSE: Duration = Duration::from_millis(100);

/// Where the controller is in its cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not started
    Idle,
    /// Waiting for a command
    Listening,
    /// Command accepted, confirmation not yet asked
    Detected(Intent),
    /// Waiting for the yes/no answer
    Confirming(Intent),
    /// Confirmed, about to be delivered
    Dispatching(Intent),
    /// Stopped; further steps do nothing
    Shutdown,
}

/// Cooldown bookkeeping carried across cycles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Time of the last successful dispatch, if any
    pub last_command_time: Option<Instant>,
    /// Minimum time between two dispatches
    pub cooldown: Duration,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl SessionState {
    /// Fresh state; the first command is never held back
    #[must_use]
    pub const fn new(cooldown: Duration) -> Self {
        Self {
            last_command_time: None,
            cooldown,
        }
    }

    /// Time left before another command may be dispatched
    ///
    /// `None` once strictly more than `cooldown` has elapsed.
    #[must_use]
    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last_command_time?;
        let elapsed = now.saturating_duration_since(last);

        if elapsed > self.cooldown {
            None
        } else {
            Some(self.cooldown - elapsed)
        }
    }

    /// Record a dispatch at `now`
    pub fn record_dispatch(&mut self, now: Instant) {
        self.last_command_time = Some(now);
    }
}

/// Timing and signal settings for the controller
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Capture and transcription settings
    pub listen: ListenSettings,
    /// Command capture window
    pub listen_window: Duration,
    /// Confirmation capture window
    pub confirm_window: Duration,
    /// Minimum time between two dispatches
    pub cooldown: Duration,
    /// Extra confirmation attempts after an unclear answer (0 = fail closed at once)
    pub unclear_retries: u8,
    /// Pause between two cycles
    pub cycle_pause: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            listen: ListenSettings::default(),
            listen_window: DEFAULT_LISTEN_WINDOW,
            confirm_window: DEFAULT_CONFIRM_WINDOW,
            cooldown: DEFAULT_COOLDOWN,
            unclear_retries: 0,
            cycle_pause: DEFAULT_CYCLE_PAUSE,
        }
    }
}

/// Drives the listen/confirm/dispatch cycle
pub struct SessionController<A, T, S> {
    source: A,
    transcriber: T,
    sink: S,
    parser: IntentParser,
    gate: ConfirmationGate,
    settings: SessionSettings,
    state: SessionState,
    phase: SessionPhase,
    confirm_attempts: u8,
    clock: Box<dyn Clock>,
    events: Box<dyn EventSink>,
}

impl<A, T, S> SessionController<A, T, S>
where
    A: AudioSource,
    T: Transcriber,
    S: ActionSink,
{
    /// Create an idle controller using the system clock and `tracing` events
    pub fn new(source: A, transcriber: T, sink: S, settings: SessionSettings) -> Self {
        let state = SessionState::new(settings.cooldown);

        Self {
            source,
            transcriber,
            sink,
            parser: IntentParser::default(),
            gate: ConfirmationGate::default(),
            settings,
            state,
            phase: SessionPhase::Idle,
            confirm_attempts: 0,
            clock: Box::new(SystemClock),
            events: Box::new(TracingEvents),
        }
    }

    /// Replace the intent parser
    #[must_use]
    pub fn with_parser(mut self, parser: IntentParser) -> Self {
        self.parser = parser;
        self
    }

    /// Replace the confirmation gate
    #[must_use]
    pub fn with_gate(mut self, gate: ConfirmationGate) -> Self {
        self.gate = gate;
        self
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the event sink
    #[must_use]
    pub fn with_events(mut self, events: impl EventSink + 'static) -> Self {
        self.events = Box::new(events);
        self
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Cooldown state
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Perform exactly one transition and return the new phase
    ///
    /// Dropping the returned future leaves the phase unchanged.
    pub async fn step(&mut self) -> &SessionPhase {
        let next = match self.phase.clone() {
            SessionPhase::Idle => {
                self.emit(&SessionEvent::Started);
                SessionPhase::Listening
            }
            SessionPhase::Listening => self.listen().await,
            SessionPhase::Detected(intent) => {
                self.confirm_attempts = 0;
                self.emit(&SessionEvent::ConfirmationRequested {
                    intent: intent.clone(),
                });
                SessionPhase::Confirming(intent)
            }
            SessionPhase::Confirming(intent) => self.confirm(intent).await,
            SessionPhase::Dispatching(intent) => self.dispatch(intent).await,
            SessionPhase::Shutdown => SessionPhase::Shutdown,
        };

        self.phase = next;
        &self.phase
    }

    /// Step until the controller is listening again (or shut down)
    ///
    /// Always performs at least one step.
    pub async fn run_cycle(&mut self) -> &SessionPhase {
        loop {
            let phase = self.step().await;
            if matches!(phase, SessionPhase::Listening | SessionPhase::Shutdown) {
                break;
            }
        }
        &self.phase
    }

    /// Run cycles until `shutdown` resolves
    ///
    /// A pending capture is abandoned as soon as `shutdown` resolves; the
    /// audio source is released when its capture future is dropped.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = self.run_cycle() => {}
            }

            if self.phase == SessionPhase::Shutdown {
                break;
            }

            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(self.settings.cycle_pause) => {}
            }
        }

        self.shutdown();
    }

    /// Stop the controller; idempotent
    pub fn shutdown(&mut self) {
        if self.phase != SessionPhase::Shutdown {
            self.phase = SessionPhase::Shutdown;
            self.emit(&SessionEvent::Shutdown);
        }
    }

    async fn listen(&mut self) -> SessionPhase {
        let heard = hear(
            &mut self.source,
            &self.transcriber,
            &self.settings.listen,
            self.settings.listen_window,
            self.clock.as_ref(),
        )
        .await;

        let utterance = match heard {
            Heard::Speech(utterance) => utterance,
            other => {
                self.report_unusable(CaptureStage::Command, other);
                return SessionPhase::Listening;
            }
        };

        let Some(intent) = self.parser.parse(&utterance.text) else {
            self.emit(&SessionEvent::NoCommand {
                text: utterance.text,
            });
            return SessionPhase::Listening;
        };

        if let Some(remaining) = self.state.cooldown_remaining(utterance.captured_at) {
            self.emit(&SessionEvent::CooldownActive {
                intent,
                remaining_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
            });
            return SessionPhase::Listening;
        }

        self.emit(&SessionEvent::IntentDetected {
            text: utterance.text,
            intent: intent.clone(),
        });
        SessionPhase::Detected(intent)
    }

    async fn confirm(&mut self, intent: Intent) -> SessionPhase {
        // answers like "ok" or "no" are shorter than a command; only empty text is unusable
        let settings = ListenSettings {
            min_text_chars: 1,
            ..self.settings.listen.clone()
        };

        let heard = hear(
            &mut self.source,
            &self.transcriber,
            &settings,
            self.settings.confirm_window,
            self.clock.as_ref(),
        )
        .await;

        let (result, response) = match heard {
            Heard::Speech(utterance) => (self.gate.classify(&utterance.text), Some(utterance.text)),
            other => {
                self.report_unusable(CaptureStage::Confirmation, other);
                (ConfirmationResult::Unclear, None)
            }
        };

        self.emit(&SessionEvent::ConfirmationResolved {
            intent: intent.clone(),
            result,
            response,
        });

        match result {
            ConfirmationResult::Affirmed => SessionPhase::Dispatching(intent),
            ConfirmationResult::Unclear if self.confirm_attempts < self.settings.unclear_retries => {
                self.confirm_attempts += 1;
                self.emit(&SessionEvent::ConfirmationRequested {
                    intent: intent.clone(),
                });
                SessionPhase::Confirming(intent)
            }
            ConfirmationResult::Declined | ConfirmationResult::Unclear => SessionPhase::Listening,
        }
    }

    async fn dispatch(&mut self, intent: Intent) -> SessionPhase {
        match self.sink.dispatch(intent.kind, &intent.order_number).await {
            Ok(()) => {
                self.state.record_dispatch(self.clock.now());
                self.emit(&SessionEvent::Dispatched { intent });
            }
            Err(e) => {
                self.emit(&SessionEvent::DispatchFailed {
                    intent,
                    error: e.to_string(),
                });
            }
        }

        SessionPhase::Listening
    }

    fn report_unusable(&self, stage: CaptureStage, heard: Heard) {
        let event = match heard {
            Heard::Silence { peak } => SessionEvent::Silence { stage, peak },
            Heard::TooShort { text } => SessionEvent::TooShort { stage, text },
            Heard::Failed(e) => SessionEvent::CaptureFailed {
                stage,
                error: e.to_string(),
            },
            Heard::Speech(_) => return,
        };
        self.emit(&event);
    }

    fn emit(&self, event: &SessionEvent) {
        self.events.emit(event);
    }
}
