use crate::api::whisper::Transcriber;
use crate::error::ExtractionError;
use crate::media::{self, MAX_AUDIO_MB};
use crate::{logi, logok};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;

const VIDEO_EXTS: &[&str] = &["mp4", "mov", "avi", "mkv"];
const AUDIO_EXTS: &[&str] = &["mp3", "m4a", "wav"];

/// Where a story comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum StorySource {
    /// Pasted text.
    Text(String),
    /// A `.txt` file, a video file, or an audio file.
    File(PathBuf),
    /// A short-video share link, possibly buried in share text.
    Link(String),
}

impl StorySource {
    /// Picks the source kind for one line of user input.
    pub fn classify(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.contains("http://") || trimmed.contains("https://") {
            return StorySource::Link(trimmed.to_string());
        }
        let path = Path::new(trimmed);
        if !trimmed.contains('\n') && path.extension().is_some() && path.exists() {
            return StorySource::File(path.to_path_buf());
        }
        StorySource::Text(input.to_string())
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Turns a [`StorySource`] into plain story text.
pub struct StoryResolver {
    transcriber: Option<Transcriber>,
}

impl StoryResolver {
    pub fn new(transcriber: Transcriber) -> Self {
        Self {
            transcriber: Some(transcriber),
        }
    }

    /// A resolver that only handles text inputs.
    pub fn text_only() -> Self {
        Self { transcriber: None }
    }

    pub async fn resolve(&self, source: &StorySource) -> Result<String, ExtractionError> {
        let text = match source {
            StorySource::Text(text) => text.clone(),
            StorySource::File(path) => self.resolve_file(path).await?,
            StorySource::Link(share_text) => self.resolve_link(share_text).await?,
        };
        if text.trim().is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(text)
    }

    async fn resolve_file(&self, path: &Path) -> Result<String, ExtractionError> {
        if fs::metadata(path).await.is_err() {
            return Err(ExtractionError::MissingFile(path.to_path_buf()));
        }

        let ext = extension_of(path);
        if ext == "txt" || ext == "md" {
            return fs::read_to_string(path)
                .await
                .map_err(|e| ExtractionError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
        }
        if AUDIO_EXTS.contains(&ext.as_str()) {
            return self.transcribe_checked(path).await;
        }
        if !VIDEO_EXTS.contains(&ext.as_str()) {
            return Err(ExtractionError::UnsupportedFile(path.display().to_string()));
        }

        let ffmpeg = media::find_ffmpeg()
            .await
            .ok_or(ExtractionError::FfmpegMissing)?;
        let scratch = scratch_dir()?;
        let audio = media::extract_audio(&ffmpeg, path, scratch.path()).await?;
        let text = self.transcribe_checked(&audio).await;
        release(scratch);
        text
    }

    async fn resolve_link(&self, share_text: &str) -> Result<String, ExtractionError> {
        let ffmpeg = media::find_ffmpeg()
            .await
            .ok_or(ExtractionError::FfmpegMissing)?;
        let scratch = scratch_dir()?;
        let audio = media::download_audio(&ffmpeg, share_text, scratch.path()).await?;
        let text = self.transcribe_checked(&audio).await;
        release(scratch);
        text
    }

    async fn transcribe_checked(&self, audio: &Path) -> Result<String, ExtractionError> {
        let size_mb = media::file_size_mb(audio).await;
        if size_mb > MAX_AUDIO_MB {
            return Err(ExtractionError::AudioTooLarge { size_mb });
        }
        let Some(transcriber) = self.transcriber.as_ref() else {
            return Err(ExtractionError::Transcription(
                "no transcription backend configured".to_string(),
            ));
        };
        let text = transcriber.transcribe(audio).await?;
        logok(format!("Extracted {} characters of story text", text.chars().count()));
        Ok(text)
    }
}

/// Scratch space for one extraction; removed when dropped on any exit path.
fn scratch_dir() -> Result<TempDir, ExtractionError> {
    tempfile::Builder::new()
        .prefix("ai-series-audio-")
        .tempdir()
        .map_err(|e| ExtractionError::AudioExtraction(format!("temp dir: {}", e)))
}

fn release(scratch: TempDir) {
    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        tracing::debug!(path = %path.display(), error = %e, "Temp audio cleanup failed");
    } else {
        logi(format!("Removed temp audio dir {}", path.display()));
    }
}
