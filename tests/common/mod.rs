//! Shared test utilities
//!
//! Scripted collaborators so the session controller can be driven without
//! a microphone or a network.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;

use brigade::voice::{AudioSource, SAMPLE_RATE, Transcriber, signal};
use brigade::{
    ActionSink, Error, IntentKind, ManualClock, RecordingEvents, Result, SessionController,
    SessionSettings,
};

/// Generate sine wave audio samples
pub fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
pub fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

/// A short buffer loud enough to pass the silence check
pub fn speech() -> Vec<f32> {
    generate_sine_samples(440.0, 0.1, 0.4)
}

/// What the microphone and the transcriber will produce, in order
#[derive(Default)]
pub struct Script {
    clips: VecDeque<Result<Vec<f32>>>,
    replies: VecDeque<Result<String>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// The chef says `text`
    pub fn say(mut self, text: &str) -> Self {
        self.clips.push_back(Ok(speech()));
        self.replies.push_back(Ok(text.to_string()));
        self
    }

    /// Nobody speaks
    pub fn silence(mut self) -> Self {
        self.clips.push_back(Ok(generate_silence(0.1)));
        self
    }

    /// The capture device errors out
    pub fn capture_error(mut self) -> Self {
        self.clips
            .push_back(Err(Error::Audio("device unplugged".to_string())));
        self
    }

    /// Someone speaks but the STT call fails
    pub fn stt_error(mut self) -> Self {
        self.clips.push_back(Ok(speech()));
        self.replies
            .push_back(Err(Error::Stt("HTTP 503".to_string())));
        self
    }

    pub fn split(self) -> (ScriptedSource, ScriptedTranscriber) {
        (
            ScriptedSource {
                clips: self.clips,
                captures: Rc::default(),
            },
            ScriptedTranscriber {
                replies: RefCell::new(self.replies),
                calls: Rc::default(),
                peaks: Rc::default(),
            },
        )
    }
}

/// Plays back scripted buffers, then silence forever
pub struct ScriptedSource {
    clips: VecDeque<Result<Vec<f32>>>,
    pub captures: Rc<Cell<usize>>,
}

#[async_trait(?Send)]
impl AudioSource for ScriptedSource {
    async fn capture(&mut self, _duration: Duration, _sample_rate: u32) -> Result<Vec<f32>> {
        self.captures.set(self.captures.get() + 1);
        self.clips
            .pop_front()
            .unwrap_or_else(|| Ok(generate_silence(0.1)))
    }
}

/// Returns scripted transcriptions and remembers what it was given
pub struct ScriptedTranscriber {
    replies: RefCell<VecDeque<Result<String>>>,
    pub calls: Rc<Cell<usize>>,
    /// Peak of every buffer it was asked to transcribe
    pub peaks: Rc<RefCell<Vec<f32>>>,
}

#[async_trait(?Send)]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, samples: &[f32], _sample_rate: u32, _language: &str) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        self.peaks.borrow_mut().push(signal::peak(samples));
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Stt("script exhausted".to_string())))
    }
}

/// Remembers dispatched commands, optionally failing every delivery
#[derive(Default)]
pub struct RecordingSink {
    pub dispatched: Rc<RefCell<Vec<(IntentKind, String)>>>,
    pub failing: bool,
}

#[async_trait(?Send)]
impl ActionSink for RecordingSink {
    async fn dispatch(&self, kind: IntentKind, order_number: &str) -> Result<()> {
        if self.failing {
            return Err(Error::Dispatch("order service unreachable".to_string()));
        }
        self.dispatched
            .borrow_mut()
            .push((kind, order_number.to_string()));
        Ok(())
    }
}

pub type TestController = SessionController<ScriptedSource, ScriptedTranscriber, RecordingSink>;

/// Handles into a test controller's collaborators
pub struct Harness {
    pub clock: ManualClock,
    pub events: RecordingEvents,
    pub dispatched: Rc<RefCell<Vec<(IntentKind, String)>>>,
    pub captures: Rc<Cell<usize>>,
    pub transcriptions: Rc<Cell<usize>>,
}

impl Harness {
    pub fn dispatched(&self) -> Vec<(IntentKind, String)> {
        self.dispatched.borrow().clone()
    }
}

/// Settings with no pause between cycles
pub fn test_settings() -> SessionSettings {
    SessionSettings {
        cycle_pause: Duration::from_millis(1),
        ..SessionSettings::default()
    }
}

/// Build a controller on a manual clock with recorded events
pub fn controller(script: Script, settings: SessionSettings) -> (TestController, Harness) {
    build(script, settings, false)
}

/// Same as [`controller`], with a sink that rejects every command
pub fn failing_controller(script: Script, settings: SessionSettings) -> (TestController, Harness) {
    build(script, settings, true)
}

fn build(script: Script, settings: SessionSettings, failing: bool) -> (TestController, Harness) {
    let (source, transcriber) = script.split();
    let sink = RecordingSink {
        failing,
        ..RecordingSink::default()
    };
    let clock = ManualClock::new();
    let events = RecordingEvents::new();

    let harness = Harness {
        clock: clock.clone(),
        events: events.clone(),
        dispatched: Rc::clone(&sink.dispatched),
        captures: Rc::clone(&source.captures),
        transcriptions: Rc::clone(&transcriber.calls),
    };

    let controller = SessionController::new(source, transcriber, sink, settings)
        .with_clock(clock)
        .with_events(events);

    (controller, harness)
}
