use crate::api::openai::classify_failure;
use crate::config::{Config, OPENAI_BASE_URL};
use crate::error::ExtractionError;
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Speech-to-text through an OpenAI-compatible `audio/transcriptions` endpoint.
pub struct Transcriber {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    /// Key used for one retry against the official endpoint.
    fallback_key: Option<String>,
}

impl Transcriber {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(900))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        let fallback_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty() && *key != cfg.api_key);

        Ok(Self {
            client,
            base_url: cfg.effective_base_url(),
            api_key: cfg.api_key.clone(),
            model: cfg.transcription_model.clone(),
            fallback_key,
        })
    }

    pub async fn transcribe(&self, audio: &Path) -> Result<String, ExtractionError> {
        if fs::metadata(audio).await.is_err() {
            return Err(ExtractionError::MissingFile(audio.to_path_buf()));
        }

        logi(format!("Transcribing audio: {}", audio.display()));
        let first = self.request(&self.base_url, &self.api_key, audio).await;
        let (status, message) = match first {
            Ok(text) => return finish(text),
            Err(failure) => failure,
        };

        let retryable = matches!(
            status,
            Some(StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED)
        ) || message.to_lowercase().contains("authentication");

        let mut error = format!("Error transcribing audio: {}", message);
        if let (true, Some(key)) = (retryable, self.fallback_key.as_deref()) {
            logw("Provider rejected transcription; retrying with OPENAI_API_KEY on the official endpoint...");
            match self.request(OPENAI_BASE_URL, key, audio).await {
                Ok(text) => {
                    logok("Transcription retry succeeded");
                    return finish(text);
                }
                Err((_, retry_message)) => {
                    error.push_str(&format!("\n(automatic retry failed: {})", retry_message));
                }
            }
        }

        logw(&error);
        Err(ExtractionError::Transcription(error))
    }

    async fn request(
        &self,
        base_url: &str,
        api_key: &str,
        audio: &Path,
    ) -> Result<String, (Option<StatusCode>, String)> {
        let bytes = fs::read(audio)
            .await
            .map_err(|e| (None, format!("read {}: {}", audio.display(), e)))?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| (None, e.to_string()))?;
        let form = Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let resp = self
            .client
            .post(format!("{}/audio/transcriptions", base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| (e.status(), e.to_string()))?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err((Some(status), classify_failure(status, &raw).to_string()));
        }

        let root: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| (Some(status), format!("bad response: {}", e)))?;
        root.get("text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or((Some(status), "response had no text".to_string()))
    }
}

fn finish(text: String) -> Result<String, ExtractionError> {
    if text.trim().is_empty() {
        Err(ExtractionError::Empty)
    } else {
        Ok(text)
    }
}
