//! Configuration management for Brigade
//!
//! Layered as environment > TOML file > defaults.

pub mod file;

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

use crate::confirm::DEFAULT_CONFIRM_THRESHOLD;
use crate::intent::DEFAULT_INTENT_THRESHOLD;
use crate::session::{
    DEFAULT_CONFIRM_WINDOW, DEFAULT_COOLDOWN, DEFAULT_CYCLE_PAUSE, DEFAULT_LISTEN_WINDOW,
    SessionSettings,
};
use crate::voice::signal::{DEFAULT_NORMALIZE_CEILING, DEFAULT_SILENCE_FLOOR};
use crate::voice::{DEFAULT_MIN_TEXT_CHARS, ListenSettings, SAMPLE_RATE, SttProvider};
use crate::{Error, Result};

use self::file::BrigadeConfigFile;

/// Default transcription language
const DEFAULT_LANGUAGE: &str = "fr";

/// Brigade configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Capture and transcription settings
    pub listen: ListenConfig,

    /// Command recognition settings
    pub intent: IntentConfig,

    /// Speech-to-text provider
    pub stt: SttConfig,

    /// Where confirmed commands go
    pub dispatch: DispatchConfig,

    /// Decision event output
    pub events: EventsFormat,
}

/// Capture and transcription settings
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Language hint for the transcriber
    pub language: String,
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Command capture window
    pub window: Duration,
    /// Confirmation capture window
    pub confirm_window: Duration,
    /// Peak amplitude below which a buffer is silence
    pub silence_floor: f32,
    /// Peak amplitude buffers are normalized to
    pub normalize_ceiling: f32,
    /// Minimum transcription length in characters
    pub min_text_chars: usize,
    /// Pause between cycles
    pub cycle_pause: Duration,
}

/// Command recognition settings
#[derive(Debug, Clone)]
pub struct IntentConfig {
    /// Minimum phrase similarity (0-100)
    pub threshold: u8,
    /// Minimum confirmation word similarity (0-100)
    pub confirm_threshold: u8,
    /// Minimum time between two dispatched commands
    pub cooldown: Duration,
    /// Extra confirmation attempts after an unclear answer
    pub unclear_retries: u8,
}

/// Speech-to-text provider settings
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Backend
    pub provider: SttProvider,
    /// Provider model
    pub model: String,
    /// API key; required to start listening
    pub api_key: Option<SecretString>,
}

/// Action sink settings
#[derive(Debug, Clone, Default)]
pub struct DispatchConfig {
    /// Order-management webhook; console output when absent
    pub webhook_url: Option<String>,
}

/// How decision events are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventsFormat {
    /// Structured `tracing` records
    #[default]
    Log,
    /// One JSON object per line on stdout
    Json,
}

impl std::str::FromStr for EventsFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "json" => Ok(Self::Json),
            other => Err(Error::Config(format!("unknown events format: {other}"))),
        }
    }
}

impl Config {
    /// Load configuration from the environment and a config file
    ///
    /// With `path`, that file must exist and parse. Without it, the standard
    /// path is used when present.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file is unusable or a value is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = match path {
            Some(path) => file::load_config_file_from(path)?,
            None => file::load_config_file(),
        };

        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be parsed or fails validation
    pub fn from_sources<F>(fc: BrigadeConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen = ListenConfig {
            language: env("BRIGADE_LANGUAGE")
                .or(fc.listen.language)
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            sample_rate: fc.listen.sample_rate.unwrap_or(SAMPLE_RATE),
            window: fc
                .listen
                .window_secs
                .map(|s| secs("listen.window_secs", s))
                .transpose()?
                .unwrap_or(DEFAULT_LISTEN_WINDOW),
            confirm_window: fc
                .listen
                .confirm_window_secs
                .map(|s| secs("listen.confirm_window_secs", s))
                .transpose()?
                .unwrap_or(DEFAULT_CONFIRM_WINDOW),
            silence_floor: fc.listen.silence_floor.unwrap_or(DEFAULT_SILENCE_FLOOR),
            normalize_ceiling: fc
                .listen
                .normalize_ceiling
                .unwrap_or(DEFAULT_NORMALIZE_CEILING),
            min_text_chars: fc.listen.min_text_chars.unwrap_or(DEFAULT_MIN_TEXT_CHARS),
            cycle_pause: fc
                .listen
                .cycle_pause_ms
                .map_or(DEFAULT_CYCLE_PAUSE, Duration::from_millis),
        };

        let cooldown_secs = match env("BRIGADE_COOLDOWN_SECS") {
            Some(raw) => Some(raw.trim().parse::<f64>().map_err(|e| {
                Error::Config(format!("BRIGADE_COOLDOWN_SECS must be a number: {e}"))
            })?),
            None => fc.intent.cooldown_secs,
        };

        let intent = IntentConfig {
            threshold: fc.intent.threshold.unwrap_or(DEFAULT_INTENT_THRESHOLD),
            confirm_threshold: fc
                .intent
                .confirm_threshold
                .unwrap_or(DEFAULT_CONFIRM_THRESHOLD),
            cooldown: cooldown_secs
                .map(|s| secs("cooldown", s))
                .transpose()?
                .unwrap_or(DEFAULT_COOLDOWN),
            unclear_retries: fc.intent.unclear_retries.unwrap_or(0),
        };

        let provider = env("BRIGADE_STT_PROVIDER")
            .or(fc.stt.provider)
            .map(|p| p.parse::<SttProvider>())
            .transpose()?
            .unwrap_or_default();

        let default_model = match provider {
            SttProvider::Whisper => "whisper-1",
            SttProvider::Deepgram => "nova-2",
        };

        let key_var = match provider {
            SttProvider::Whisper => "OPENAI_API_KEY",
            SttProvider::Deepgram => "DEEPGRAM_API_KEY",
        };

        let stt = SttConfig {
            provider,
            model: env("BRIGADE_STT_MODEL")
                .or(fc.stt.model)
                .unwrap_or_else(|| default_model.to_string()),
            api_key: env(key_var).or(fc.stt.api_key).map(SecretString::from),
        };

        let dispatch = DispatchConfig {
            webhook_url: env("BRIGADE_WEBHOOK_URL")
                .or(fc.dispatch.webhook_url)
                .filter(|u| !u.trim().is_empty()),
        };

        let events = env("BRIGADE_EVENTS")
            .or(fc.events.format)
            .map(|f| f.parse::<EventsFormat>())
            .transpose()?
            .unwrap_or_default();

        let config = Self {
            listen,
            intent,
            stt,
            dispatch,
            events,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.intent.threshold > 100 {
            return Err(Error::Config("intent.threshold must be 0-100".to_string()));
        }
        if self.intent.confirm_threshold > 100 {
            return Err(Error::Config(
                "intent.confirm_threshold must be 0-100".to_string(),
            ));
        }
        if self.listen.sample_rate == 0 {
            return Err(Error::Config("listen.sample_rate must be positive".to_string()));
        }
        if self.listen.window.is_zero() || self.listen.confirm_window.is_zero() {
            return Err(Error::Config("capture windows must be positive".to_string()));
        }
        if !(self.listen.silence_floor > 0.0
            && self.listen.silence_floor < self.listen.normalize_ceiling
            && self.listen.normalize_ceiling <= 1.0)
        {
            return Err(Error::Config(
                "expected 0 < silence_floor < normalize_ceiling <= 1".to_string(),
            ));
        }
        if let Some(url) = &self.dispatch.webhook_url {
            url::Url::parse(url)
                .map_err(|e| Error::Config(format!("invalid webhook url {url}: {e}")))?;
        }
        Ok(())
    }

    /// Settings for the session controller
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            listen: ListenSettings {
                sample_rate: self.listen.sample_rate,
                language: self.listen.language.clone(),
                silence_floor: self.listen.silence_floor,
                normalize_ceiling: self.listen.normalize_ceiling,
                min_text_chars: self.listen.min_text_chars,
            },
            listen_window: self.listen.window,
            confirm_window: self.listen.confirm_window,
            cooldown: self.intent.cooldown,
            unclear_retries: self.intent.unclear_retries,
            cycle_pause: self.listen.cycle_pause,
        }
    }
}

/// Seconds from configuration into a `Duration`
fn secs(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| Error::Config(format!("{name} must be a non-negative number of seconds: {e}")))
}
