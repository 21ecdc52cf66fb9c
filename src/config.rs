//! Runtime configuration: an optional TOML file plus environment overrides.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::assistant::DEFAULT_MAX_INPUT_CHARS;

pub const ENV_REMOTE_URL: &str = "SITETRACK_REMOTE_URL";
pub const ENV_REMOTE_KEY: &str = "SITETRACK_REMOTE_KEY";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "SITETRACK_MODEL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// Remote backend. Both fields are needed for sync to be enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

fn default_max_input_chars() -> usize {
    DEFAULT_MAX_INPUT_CHARS
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            base_url: None,
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl RemoteConfig {
    /// `(url, api_key)` when both are set and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let url = self.url.as_deref().filter(|s| !s.trim().is_empty())?;
        let key = self.api_key.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((url, key))
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Invalid configuration file")
    }

    /// Read `path` if given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Environment values win over file values; empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_REMOTE_URL) {
            self.remote.url = Some(url);
        }
        if let Some(key) = get(ENV_REMOTE_KEY) {
            self.remote.api_key = Some(key);
        }
        if let Some(key) = get(ENV_OPENAI_KEY) {
            self.assistant.api_key = Some(key);
        }
        if let Some(model) = get(ENV_MODEL) {
            self.assistant.model = Some(model);
        }
    }
}
