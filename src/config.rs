use crate::history::DEFAULT_HISTORY_DIR;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// LLM vendor presets; each one implies a default base URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    DeepSeek,
    Moonshot,
    Custom,
}

impl Provider {
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some(OPENAI_BASE_URL),
            Provider::DeepSeek => Some("https://api.deepseek.com"),
            Provider::Moonshot => Some("https://api.moonshot.cn/v1"),
            Provider::Custom => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "openai_api_key", alias = "api_key")]
    pub api_key: String,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    #[serde(default = "default_history_dir")]
    pub history_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_history_dir() -> PathBuf {
    PathBuf::from(DEFAULT_HISTORY_DIR)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config: {}", path.as_ref().display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the config from `OPENAI_API_KEY`, `OPENAI_BASE_URL` and
    /// `OPENAI_MODEL`, after loading a `.env` file if one exists.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let model = std::env::var("OPENAI_MODEL")
            .ok()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(default_model);

        let config = Config {
            api_key,
            provider: if base_url.is_some() {
                Provider::Custom
            } else {
                Provider::OpenAi
            },
            base_url,
            model,
            temperature: default_temperature(),
            transcription_model: default_transcription_model(),
            history_dir: default_history_dir(),
            output_dir: default_output_dir(),
        };
        config.validate()?;
        Ok(config)
    }

    /// `config.json` when present, otherwise the environment.
    pub async fn discover() -> Result<Self> {
        if fs::metadata(DEFAULT_CONFIG_PATH).await.is_ok() {
            Self::load(DEFAULT_CONFIG_PATH).await
        } else {
            Self::from_env()
        }
    }

    /// Explicit `base_url` wins over the provider preset.
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .or_else(|| self.provider.default_base_url())
            .unwrap_or(OPENAI_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!("API key missing: set openai_api_key in config.json or OPENAI_API_KEY");
        }
        if self.provider == Provider::Custom && self.base_url.is_none() {
            anyhow::bail!("provider \"custom\" requires base_url");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_applies_defaults_and_presets() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"openai_api_key": "sk-test", "provider": "deepseek"}"#)
            .await
            .unwrap();

        let cfg = Config::load(&path).await.unwrap();
        assert_eq!(cfg.model, "gpt-4o");
        assert_eq!(cfg.effective_base_url(), "https://api.deepseek.com");
        assert_eq!(cfg.history_dir, PathBuf::from("saved_projects"));
    }

    #[tokio::test]
    async fn explicit_base_url_wins() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"api_key": "sk-test", "provider": "moonshot", "base_url": "http://localhost:8080/v1/"}"#,
        )
        .await
        .unwrap();

        let cfg = Config::load(&path).await.unwrap();
        assert_eq!(cfg.effective_base_url(), "http://localhost:8080/v1");
    }

    #[tokio::test]
    async fn missing_key_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"openai_api_key": ""}"#).await.unwrap();
        assert!(Config::load(&path).await.is_err());
    }
}
