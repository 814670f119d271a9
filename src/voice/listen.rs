//! One capture-and-transcribe pass
//!
//! Records a fixed window, drops dead air before it reaches the STT
//! collaborator, normalizes the level and transcribes.

use std::time::{Duration, Instant};

use super::signal::{self, DEFAULT_NORMALIZE_CEILING, DEFAULT_SILENCE_FLOOR};
use super::{AudioSource, SAMPLE_RATE, Transcriber};
use crate::Error;
use crate::clock::Clock;

/// Transcriptions this short (in characters, trimmed) are treated as noise
pub const DEFAULT_MIN_TEXT_CHARS: usize = 3;

/// A transcribed utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Transcribed text, trimmed
    pub text: String,
    /// When the capture finished
    pub captured_at: Instant,
}

/// What a listening pass produced
#[derive(Debug)]
pub enum Heard {
    /// Usable speech
    Speech(Utterance),
    /// Peak amplitude under the silence floor; nothing was transcribed
    Silence {
        /// Peak absolute amplitude of the buffer
        peak: f32,
    },
    /// Transcription was effectively empty
    TooShort {
        /// What the STT returned, trimmed
        text: String,
    },
    /// Capture or transcription failed
    Failed(Error),
}

/// Signal and text thresholds for a listening pass
#[derive(Debug, Clone)]
pub struct ListenSettings {
    /// Capture sample rate
    pub sample_rate: u32,
    /// Language hint passed to the transcriber
    pub language: String,
    /// Peak amplitude below which a buffer is silence
    pub silence_floor: f32,
    /// Peak amplitude buffers are normalized to
    pub normalize_ceiling: f32,
    /// Minimum trimmed transcription length, in characters
    pub min_text_chars: usize,
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            language: "fr".to_string(),
            silence_floor: DEFAULT_SILENCE_FLOOR,
            normalize_ceiling: DEFAULT_NORMALIZE_CEILING,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
        }
    }
}

/// Record `duration` of audio and transcribe it
///
/// Never returns an error: failures are reported as [`Heard::Failed`] so the
/// caller can keep listening.
pub async fn hear<A, T>(
    source: &mut A,
    transcriber: &T,
    settings: &ListenSettings,
    duration: Duration,
    clock: &dyn Clock,
) -> Heard
where
    A: AudioSource + ?Sized,
    T: Transcriber + ?Sized,
{
    let mut samples = match source.capture(duration, settings.sample_rate).await {
        Ok(samples) => samples,
        Err(e) => return Heard::Failed(e),
    };

    // a flat buffer is silence whatever the floor
    let peak = signal::peak(&samples);
    if peak <= 0.0 || peak < settings.silence_floor {
        tracing::trace!(peak, "silence");
        return Heard::Silence { peak };
    }

    signal::normalize_peak(&mut samples, settings.normalize_ceiling);

    let text = match transcriber
        .transcribe(&samples, settings.sample_rate, &settings.language)
        .await
    {
        Ok(text) => text.trim().to_string(),
        Err(e) => return Heard::Failed(e),
    };

    if text.chars().count() < settings.min_text_chars {
        tracing::trace!(text = %text, "transcription too short");
        return Heard::TooShort { text };
    }

    Heard::Speech(Utterance {
        text,
        captured_at: clock.now(),
    })
}
