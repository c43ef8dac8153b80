use crate::client::consts::{BASE_URL, DEFAULT_TRANSCRIPTION_MODEL, OPENAI_API_KEY};
use secrecy::SecretString;

/// Connection settings for a realtime transcription session.
pub struct Config {
    base_url: String,
    api_key: SecretString,
    model: String,
    language: Option<String>,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = SecretString::from(api_key.to_string());
        self
    }

    /// The transcription model, e.g. `gpt-4o-transcribe` or `whisper-1`.
    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    /// ISO-639-1 hint for the spoken language.
    pub fn with_language(mut self, language: &str) -> Self {
        self.config.language = Some(language.to_string());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Defaults, with the API key taken from `OPENAI_API_KEY` if it is set.
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            api_key: std::env::var(OPENAI_API_KEY).unwrap_or_default().into(),
            model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            language: None,
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
