//! Application Configuration Module
//!
//! Loads the rehearsal front end's settings from environment variables (and a
//! `.env` file, when present) into a single struct.

use std::env;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_INTERVIEW_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "gpt-4o-transcribe";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechProvider {
    /// Microphone audio transcribed by the OpenAI realtime API.
    OpenAI,
    /// Typed answers only.
    None,
}

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub interview_api_url: String,
    pub request_timeout: Duration,
    pub speech_provider: SpeechProvider,
    pub openai_api_key: Option<String>,
    pub transcription_model: String,
    pub input_device: Option<String>,
    pub log_level: Level,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid REQUEST_TIMEOUT_SECS, expected a positive number of seconds: {0}")]
    InvalidTimeout(String),
    #[error("Unknown SPEECH_PROVIDER '{0}', expected 'openai' or 'none'")]
    UnknownProvider(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `INTERVIEW_API_URL`: (Optional) Base URL of the interview service. Defaults to "http://127.0.0.1:8000".
    // *   `REQUEST_TIMEOUT_SECS`: (Optional) Per-request timeout. Defaults to 90.
    // *   `SPEECH_PROVIDER`: (Optional) "openai" or "none". Defaults to "none".
    // *   `OPENAI_API_KEY`: Required if the speech provider is "openai".
    // *   `TRANSCRIPTION_MODEL`: (Optional) Defaults to "gpt-4o-transcribe".
    // *   `INPUT_DEVICE`: (Optional) Microphone name. Defaults to the system default input.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Ignored if there is no .env file.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let interview_api_url =
            non_empty("INTERVIEW_API_URL").unwrap_or_else(|| DEFAULT_INTERVIEW_API_URL.to_string());

        let request_timeout = match non_empty("REQUEST_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
        };

        let speech_provider = match non_empty("SPEECH_PROVIDER")
            .map(|v| v.trim().to_lowercase())
            .as_deref()
        {
            None | Some("none") => SpeechProvider::None,
            Some("openai") => SpeechProvider::OpenAI,
            Some(other) => return Err(ConfigError::UnknownProvider(other.to_string())),
        };

        let openai_api_key = non_empty("OPENAI_API_KEY");
        if speech_provider == SpeechProvider::OpenAI && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar(
                "OPENAI_API_KEY must be set for the openai speech provider".to_string(),
            ));
        }

        let transcription_model = non_empty("TRANSCRIPTION_MODEL")
            .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string());
        let input_device = non_empty("INPUT_DEVICE");

        let log_level_str = non_empty("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            interview_api_url,
            request_timeout,
            speech_provider,
            openai_api_key,
            transcription_model,
            input_device,
            log_level,
        })
    }
}
