use crate::logok;
use crate::session::SessionState;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Writes the session's generated artifacts as plain files in `out_dir`.
///
/// `original_story` is set when the story itself was generated from a theme.
/// Returns the written paths.
pub async fn export_session(
    state: &SessionState,
    out_dir: &Path,
    original_story: bool,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create dir {}", out_dir.display()))?;

    let mut files = Vec::new();
    if original_story && state.has_story() {
        files.push((
            out_dir.join("0_original_story.txt"),
            state.story_content.render_markdown(),
        ));
    }
    if state.has_outline() {
        files.push((
            out_dir.join("1_series_plan.txt"),
            state.series_plan.render_markdown(),
        ));
    }
    for (episode, content) in &state.episode_contents {
        files.push((
            out_dir.join(format!("episode_{}.md", episode)),
            content.render_markdown(),
        ));
    }

    let mut written = Vec::with_capacity(files.len());
    for (path, body) in files {
        fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    logok(format!("Saved {} files to {}", written.len(), out_dir.display()));
    Ok(written)
}
