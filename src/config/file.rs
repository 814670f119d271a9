//! TOML configuration file loading
//!
//! Supports `~/.config/brigade/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrigadeConfigFile {
    /// Capture and transcription settings
    #[serde(default)]
    pub listen: ListenFileConfig,

    /// Command recognition settings
    #[serde(default)]
    pub intent: IntentFileConfig,

    /// Speech-to-text provider
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Where confirmed commands go
    #[serde(default)]
    pub dispatch: DispatchFileConfig,

    /// Decision event output
    #[serde(default)]
    pub events: EventsFileConfig,
}

/// Capture and transcription settings
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenFileConfig {
    /// Language hint for the transcriber (e.g. "fr")
    pub language: Option<String>,
    /// Capture sample rate in Hz
    pub sample_rate: Option<u32>,
    /// Command capture window in seconds
    pub window_secs: Option<f64>,
    /// Confirmation capture window in seconds
    pub confirm_window_secs: Option<f64>,
    /// Peak amplitude below which a buffer is silence
    pub silence_floor: Option<f32>,
    /// Peak amplitude buffers are normalized to
    pub normalize_ceiling: Option<f32>,
    /// Minimum transcription length in characters
    pub min_text_chars: Option<usize>,
    /// Pause between cycles in milliseconds
    pub cycle_pause_ms: Option<u64>,
}

/// Command recognition settings
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntentFileConfig {
    /// Minimum phrase similarity (0-100)
    pub threshold: Option<u8>,
    /// Minimum confirmation word similarity (0-100)
    pub confirm_threshold: Option<u8>,
    /// Minimum seconds between two dispatched commands
    pub cooldown_secs: Option<f64>,
    /// Extra confirmation attempts after an unclear answer
    pub unclear_retries: Option<u8>,
}

/// Speech-to-text provider
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SttFileConfig {
    /// "whisper" or "deepgram"
    pub provider: Option<String>,
    /// Provider model (e.g. "whisper-1", "nova-2")
    pub model: Option<String>,
    /// API key (prefer the environment)
    pub api_key: Option<String>,
}

/// Where confirmed commands go
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchFileConfig {
    /// Order-management webhook; console output when absent
    pub webhook_url: Option<String>,
}

/// Decision event output
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsFileConfig {
    /// "log" or "json"
    pub format: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `BrigadeConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> BrigadeConfigFile {
    let Some(path) = config_file_path() else {
        return BrigadeConfigFile::default();
    };

    if !path.exists() {
        return BrigadeConfigFile::default();
    }

    match load_config_file_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            BrigadeConfigFile::default()
        }
    }
}

/// Load a config file the user pointed at explicitly
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn load_config_file_from(path: &Path) -> Result<BrigadeConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/brigade/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("brigade").join("config.toml"))
}
