use crate::config::Config;
use crate::content::Content;
use crate::error::GenerationError;
use crate::generator::{GenerationClient, GenerationRequest};
use crate::prompts::SYSTEM_PROMPT;
use crate::{logi, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;

const MAX_PROMPT_BYTES: usize = 320_000;
const REQUEST_TIMEOUT_SECS: u64 = 600;

pub(crate) fn trim_copy_utf8_safe(input: &str, max_bytes: usize) -> String {
    if input.len() <= max_bytes {
        return input.to_string();
    }

    let mut cut = max_bytes.min(input.len());
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    input[..cut].to_string()
}

/// Pulls `error.message` out of an API error body, logging type and code.
pub(crate) fn api_error_message(raw: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(raw).ok()?;
    let err = root.get("error")?;

    if let Some(typ) = err.get("type").and_then(|v| v.as_str()) {
        logw(format!("API error type: {}", typ));
    }
    if let Some(code) = err.get("code").and_then(|v| v.as_str()) {
        logw(format!("API error code: {}", code));
    }
    err.get("message")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn extract_message_content(raw: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(raw).ok()?;
    root.get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

/// Maps a non-success HTTP reply to an error; 401/403 are authentication failures.
pub(crate) fn classify_failure(status: StatusCode, raw: &str) -> GenerationError {
    let message = api_error_message(raw).unwrap_or_else(|| {
        let snippet = raw.chars().take(800).collect::<String>();
        if snippet.is_empty() {
            status.canonical_reason().unwrap_or("no body").to_string()
        } else {
            snippet
        }
    });

    let lowered = message.to_lowercase();
    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || lowered.contains("invalid api key")
        || lowered.contains("incorrect api key")
    {
        GenerationError::Authentication {
            status: status.as_u16(),
            message,
        }
    } else {
        GenerationError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Chat-completions client for OpenAI and compatible vendors.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, cfg))
    }

    pub fn with_client(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            base_url: cfg.effective_base_url(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl GenerationClient for OpenAiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Content, GenerationError> {
        let prompt = trim_copy_utf8_safe(&request.prompt, MAX_PROMPT_BYTES);

        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "temperature": request.temperature,
        });
        if request.structured {
            body["response_format"] = json!({"type": "json_object"});
        }

        logi(format!("Calling LLM with model: {}", self.model));
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            logw(format!("LLM HTTP {}", status.as_u16()));
            return Err(classify_failure(status, &raw));
        }

        let Some(text) = extract_message_content(&raw) else {
            logw("LLM response parse failed.".to_string());
            if !raw.is_empty() {
                let snippet = raw.chars().take(800).collect::<String>();
                logw(format!("LLM raw body: {}", snippet));
            }
            return Err(GenerationError::EmptyResponse);
        };

        if request.structured {
            Ok(Content::from_model_reply(&text))
        } else {
            Ok(Content::Text(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_on_char_boundary() {
        let text = "ab漫剧";
        assert_eq!(trim_copy_utf8_safe(text, 4), "ab");
        assert_eq!(trim_copy_utf8_safe(text, 100), text);
    }

    #[test]
    fn extracts_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Episode text"}}]}"#;
        assert_eq!(extract_message_content(raw).as_deref(), Some("Episode text"));
        assert!(extract_message_content(r#"{"choices":[]}"#).is_none());
    }

    #[test]
    fn unauthorized_is_authentication_failure() {
        let raw = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        let err = classify_failure(StatusCode::UNAUTHORIZED, raw);
        assert!(err.is_authentication());
        assert!(err.to_string().contains("Incorrect API key provided"));

        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(!err.is_authentication());
    }
}
