use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Configuration {
    pub interval: Option<IntervalConfig>,
    pub engine: EngineConfig,
    pub homeassistant: HomeAssistantConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntervalConfig {
    pub seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(rename = "apiUrl")]
    pub api_url: String,
    #[serde(rename = "apikey")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HomeAssistantConfig {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    pub token: String,
}

impl EngineConfig {
    /// Base URL with any trailing slash stripped.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

impl HomeAssistantConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Configuration {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Configuration = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        Url::parse(self.engine.base_url())
            .with_context(|| format!("engine.apiUrl is not a valid URL: {}", self.engine.api_url))?;
        Url::parse(self.homeassistant.base_url()).with_context(|| {
            format!(
                "homeassistant.baseUrl is not a valid URL: {}",
                self.homeassistant.base_url
            )
        })?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.interval
                .as_ref()
                .map(|i| i.seconds)
                .unwrap_or(3600)
        )
    }
}
