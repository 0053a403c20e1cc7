use crate::content::Content;
use crate::error::GenerationError;
use crate::prompts::{self, render};
use crate::{logi, logok};
use async_trait::async_trait;

const DEFAULT_TEMPERATURE: f32 = 0.7;
const STORY_TEMPERATURE: f32 = 0.8;

/// One rendered prompt for the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Ask for a JSON reply; replies that fail to parse come back as text.
    pub structured: bool,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn text(prompt: String) -> Self {
        Self {
            prompt,
            structured: false,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn structured(prompt: String) -> Self {
        Self {
            structured: true,
            ..Self::text(prompt)
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// LLM backend. Stateless per call.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Content, GenerationError>;
}

#[async_trait]
impl<T: GenerationClient + ?Sized> GenerationClient for std::sync::Arc<T> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Content, GenerationError> {
        (**self).generate(request).await
    }
}

/// Renders the series prompts and sends them to a [`GenerationClient`].
pub struct SeriesWriter<C> {
    client: C,
    structured: bool,
    temperature: f32,
}

impl<C: GenerationClient> SeriesWriter<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            structured: false,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Request JSON outlines and episodes instead of Markdown.
    pub fn structured(mut self, structured: bool) -> Self {
        self.structured = structured;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn original_story(&self, theme: &str) -> Result<Content, GenerationError> {
        logi("Writing an original story from the theme...");
        let prompt = render(prompts::ORIGINAL_STORY_PROMPT, &[("theme", theme)]);
        let story = self
            .client
            .generate(&GenerationRequest::text(prompt).with_temperature(STORY_TEMPERATURE))
            .await?;
        logok("Original story ready");
        Ok(story)
    }

    pub async fn plan_series(&self, story: &Content) -> Result<Content, GenerationError> {
        logi("Planning the 10-episode structure...");
        let template = if self.structured {
            prompts::SERIES_PLAN_JSON_PROMPT
        } else {
            prompts::SERIES_PLAN_PROMPT
        };
        let story_text = story.to_prompt_text();
        let prompt = render(template, &[("story", story_text.as_str())]);
        let plan = self.client.generate(&self.request(prompt)).await?;
        logok("Series plan ready");
        Ok(plan)
    }

    pub async fn write_episode(
        &self,
        episode: u32,
        story: &Content,
        plan: &Content,
        summary: &str,
    ) -> Result<Content, GenerationError> {
        logi(format!("Writing episode {} (EN/CN)...", episode));
        let template = if self.structured {
            prompts::EPISODE_CONTENT_JSON_PROMPT
        } else {
            prompts::EPISODE_CONTENT_PROMPT
        };
        let episode_num = episode.to_string();
        let plan_text = plan.to_prompt_text();
        let story_text = story.to_prompt_text();
        let prompt = render(
            template,
            &[
                ("episode_num", episode_num.as_str()),
                ("current_summary", summary),
                ("series_plan", plan_text.as_str()),
                ("story_context", story_text.as_str()),
            ],
        );
        let content = self.client.generate(&self.request(prompt)).await?;
        logok(format!("Episode {} ready", episode));
        Ok(content)
    }

    fn request(&self, prompt: String) -> GenerationRequest {
        let request = if self.structured {
            GenerationRequest::structured(prompt)
        } else {
            GenerationRequest::text(prompt)
        };
        request.with_temperature(self.temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl GenerationClient for Recorder {
        async fn generate(&self, request: &GenerationRequest) -> Result<Content, GenerationError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(Content::from("ok"))
        }
    }

    #[tokio::test]
    async fn episode_prompt_carries_context() {
        let writer = SeriesWriter::new(Recorder::default());
        writer
            .write_episode(4, &Content::from("A heist story"), &Content::from("the plan"), "Vault day")
            .await
            .unwrap();

        let requests = writer.client().requests.lock().unwrap();
        let prompt = &requests[0].prompt;
        assert!(prompt.contains("Episode 4"));
        assert!(prompt.contains("Source story: A heist story"));
        assert!(prompt.contains("Series plan: the plan"));
        assert!(prompt.contains("This episode's summary: Vault day"));
        assert!(!requests[0].structured);
    }

    #[tokio::test]
    async fn structured_mode_requests_json() {
        let writer = SeriesWriter::new(Recorder::default()).structured(true);
        writer.plan_series(&Content::from("story")).await.unwrap();
        writer.original_story("cyberpunk").await.unwrap();

        let requests = writer.client().requests.lock().unwrap();
        assert!(requests[0].structured);
        assert!(requests[0].prompt.contains("series_outline"));
        assert!(!requests[1].structured);
        assert_eq!(requests[1].temperature, STORY_TEMPERATURE);
    }
}
