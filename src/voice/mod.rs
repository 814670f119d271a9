//! Voice processing module
//!
//! Audio capture, signal checks and transcription. The session controller
//! only sees the [`AudioSource`] and [`Transcriber`] traits, so tests can
//! script what the microphone "heard".

mod capture;
mod listen;
pub mod signal;
mod stt;

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use listen::{DEFAULT_MIN_TEXT_CHARS, Heard, ListenSettings, Utterance, hear};
pub use stt::{SpeechToText, SttProvider};

/// Produces fixed-length mono PCM buffers
#[async_trait(?Send)]
pub trait AudioSource {
    /// Record for `duration` and return samples in `[-1.0, 1.0]`
    ///
    /// # Errors
    ///
    /// Returns error if the device fails
    async fn capture(&mut self, duration: Duration, sample_rate: u32) -> Result<Vec<f32>>;
}

/// Converts speech to text
#[async_trait(?Send)]
pub trait Transcriber {
    /// Transcribe a mono buffer using `language` as a hint (e.g. "fr")
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    async fn transcribe(&self, samples: &[f32], sample_rate: u32, language: &str)
    -> Result<String>;
}
