use crate::config::Config;
use crate::logi;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// Creates the history and export directories named by the config.
pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    for dir in [&cfg.history_dir, &cfg.output_dir] {
        if !Path::new(dir).exists() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
            logi(format!("Created directory: {}", dir.display()));
        }
    }
    Ok(())
}

pub async fn check_ffmpeg() -> bool {
    crate::media::find_ffmpeg().await.is_some()
}
