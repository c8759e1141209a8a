use std::path::Path;

use anyhow::{Context, Result};
use dialogue::debate::{DebateConfig, DiscussionConfig};
use serde::Deserialize;
use thiserror::Error;

use crate::personas::PersonaSpec;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

fn default_source_name() -> String {
    "default".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_temperature() -> f32 {
    0.7
}

/// One OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiSource {
    #[serde(default = "default_source_name")]
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Environment variable to read the key from when `api_key` is empty.
    #[serde(default)]
    pub api_key_env: Option<String>,
    pub model: String,
    /// Lower values are tried first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after the first failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl ApiSource {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: String::new(),
            api_key_env: None,
            model: model.into(),
            priority: 0,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            temperature: default_temperature(),
        }
    }

    /// Single source built from `AGORA_BASE_URL`, `AGORA_API_KEY` and
    /// `AGORA_MODEL`.
    pub fn from_env() -> Self {
        let mut source = Self::new(
            default_source_name(),
            std::env::var("AGORA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
            std::env::var("AGORA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
        );
        source.api_key = std::env::var("AGORA_API_KEY").unwrap_or_default();
        source
    }

    fn resolve_key(&mut self) {
        if self.api_key.is_empty() {
            if let Some(var) = &self.api_key_env {
                self.api_key = std::env::var(var).unwrap_or_default();
            }
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub sources: Vec<ApiSource>,
    /// Returned as the reply when every source has failed. When unset the
    /// failure is reported instead.
    #[serde(default)]
    pub fallback_message: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no model sources configured")]
    NoSources,
    #[error("source '{0}' has an empty base_url")]
    EmptyBaseUrl(String),
    #[error("source '{0}' has an empty model name")]
    EmptyModel(String),
    #[error("source name '{0}' is used more than once")]
    DuplicateSource(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AgoraConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub debate: Option<DebateConfig>,
    #[serde(default)]
    pub discussion: Option<DiscussionConfig>,
    /// Extra or replacement personas.
    #[serde(default)]
    pub personas: Vec<PersonaSpec>,
}

impl Default for AgoraConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                sources: vec![ApiSource::from_env()],
                fallback_message: None,
            },
            debate: None,
            discussion: None,
            personas: Vec::new(),
        }
    }
}

impl AgoraConfig {
    /// Load from a TOML file. An empty source list falls back to the
    /// environment.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(text).context("Failed to parse TOML")?;
        if config.model.sources.is_empty() {
            config.model.sources.push(ApiSource::from_env());
        }
        for source in &mut config.model.sources {
            source.resolve_key();
        }
        config.validate()?;
        Ok(config)
    }

    /// `path` when given, otherwise the environment defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let mut names = std::collections::HashSet::new();
        for source in &self.model.sources {
            if source.base_url.trim().is_empty() {
                return Err(ConfigError::EmptyBaseUrl(source.name.clone()));
            }
            if source.model.trim().is_empty() {
                return Err(ConfigError::EmptyModel(source.name.clone()));
            }
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource(source.name.clone()));
            }
        }
        Ok(())
    }
}
