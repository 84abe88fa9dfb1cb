// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::errors::BanterError;
use crate::infra::paths;

pub const DEFAULT_FALLBACK_MESSAGE: &str = "⚠️ Sorry, I'm having trouble responding right now.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub persona: PersonaConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// `google` or `openai_compat`
    pub provider: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Endpoint override; empty means the provider default.
    pub base_url: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    /// 0 keeps the HTTP client default (no local timeout).
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "google".into(),
            model: "gemini-2.0-flash".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            base_url: String::new(),
            temperature: 0.8,
            max_output_tokens: 500,
            request_timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub name: String,
    /// Inline system instruction. Persona files take priority over this.
    pub instruction: Option<String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "Banter".into(),
            instruction: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub fallback_message: String,
    pub session_idle_minutes: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            fallback_message: DEFAULT_FALLBACK_MESSAGE.into(),
            session_idle_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Extra origins allowed to call the JSON API from a browser.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8501,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the remote service or the session would misbehave on.
    pub fn validate(&self) -> Result<(), BanterError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(BanterError::Config(format!(
                "model.temperature must be within [0, 2], got {}",
                self.model.temperature
            )));
        }
        if self.model.max_output_tokens == 0 {
            return Err(BanterError::Config(
                "model.max_output_tokens must be positive".into(),
            ));
        }
        if self.model.model.trim().is_empty() {
            return Err(BanterError::Config("model.model cannot be empty".into()));
        }
        if self.chat.fallback_message.trim().is_empty() {
            return Err(BanterError::Config(
                "chat.fallback_message cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Idle window after which the registry drops a session.
    pub fn session_idle(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.chat.session_idle_minutes.saturating_mul(60))
    }
}
