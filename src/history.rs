//! Project history: one pretty-printed JSON file per project, named
//! `{id}_{safe_title}.json`, so listing needs no separate index.
//!
//! Single writer, last write wins. Nothing here locks.

use crate::error::HistoryError;
use crate::project::{Project, ProjectSummary};
use crate::session::SessionState;
use crate::{logi, logw};
use chrono::Local;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use walkdir::WalkDir;

pub const DEFAULT_HISTORY_DIR: &str = "saved_projects";

const TITLE_SLUG_MAX_CHARS: usize = 20;
const RECORD_EXT: &str = "json";

static LAST_ISSUED_ID: AtomicU64 = AtomicU64::new(0);

pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    /// Opens the store, creating its directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| HistoryError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists the session under `id`, or under a fresh id when `id` is `None`.
    ///
    /// Returns the id the record was stored under. An empty story is not saved
    /// and `id` is handed back unchanged.
    pub async fn save(
        &self,
        state: &SessionState,
        id: Option<&str>,
    ) -> Result<Option<String>, HistoryError> {
        if !state.has_story() {
            return Ok(id.map(str::to_string));
        }

        let id = match id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self.issue_id(),
        };

        let title = state.story_content.derive_title();
        let existing = self.owned_records(&id).await?;

        let mut updated_at = Local::now().naive_local();
        if let Some(previous) = existing.iter().map(|(_, summary)| summary.updated_at).max() {
            updated_at = updated_at.max(previous);
        }

        let project = Project {
            id: id.clone(),
            title: title.clone(),
            updated_at,
            story_content: state.story_content.clone(),
            series_plan: state.series_plan.clone(),
            episode_contents: state.episode_contents.clone(),
            next_episode_to_generate: state.next_episode_to_generate,
        };

        let target = self.free_record_path(&id, &title, &existing);
        let body = serde_json::to_string_pretty(&project).map_err(|source| HistoryError::Encode {
            id: id.clone(),
            source,
        })?;
        write_atomic(&target, body.as_bytes()).await?;

        for (stale, _) in existing.iter().filter(|(path, _)| *path != target) {
            fs::remove_file(stale)
                .await
                .map_err(|e| HistoryError::io(stale, e))?;
            logi(format!("Replaced stale record {}", stale.display()));
        }

        tracing::debug!(id = %id, path = %target.display(), "Saved project");
        Ok(Some(id))
    }

    /// Loads the project stored under `id`. Missing and corrupt records both
    /// come back as `None`; corruption is logged. When an interrupted save
    /// left more than one record, the most recently updated one wins.
    pub async fn load(&self, id: &str) -> Result<Option<Project>, HistoryError> {
        let newest = self
            .owned_records(id)
            .await?
            .into_iter()
            .max_by_key(|(_, summary)| summary.updated_at);
        let Some((path, _)) = newest else {
            return Ok(None);
        };

        match read_record::<Project>(&path).await {
            Ok(project) => Ok(Some(project)),
            Err(err @ HistoryError::CorruptRecord { .. }) => {
                logw(format!("Error loading project {}: {}", id, err));
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Every readable record, most recently updated first.
    pub async fn list(&self) -> Result<Vec<ProjectSummary>, HistoryError> {
        let mut projects = Vec::new();
        for path in self.all_record_paths() {
            let has_id_prefix = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.split_once('_').is_some());
            if !has_id_prefix {
                continue;
            }

            match read_record::<ProjectSummary>(&path).await {
                Ok(mut summary) => {
                    summary.file_path = path;
                    projects.push(summary);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable project record");
                }
            }
        }

        projects.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        let mut seen = HashSet::new();
        projects.retain(|summary| seen.insert(summary.id.clone()));
        Ok(projects)
    }

    /// Removes every record stored under `id`. Unknown ids are a no-op.
    pub async fn delete(&self, id: &str) -> Result<(), HistoryError> {
        for (path, _) in self.owned_records(id).await? {
            fs::remove_file(&path)
                .await
                .map_err(|e| HistoryError::io(&path, e))?;
            logi(format!("Deleted project record {}", path.display()));
        }
        Ok(())
    }

    fn record_path(&self, id: &str, title: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{}", id, safe_title(title), RECORD_EXT))
    }

    /// `record_path`, numbered when that name already holds another
    /// project's record.
    fn free_record_path(
        &self,
        id: &str,
        title: &str,
        owned: &[(PathBuf, ProjectSummary)],
    ) -> PathBuf {
        let is_free = |path: &PathBuf| !path.exists() || owned.iter().any(|(p, _)| p == path);
        let base = self.record_path(id, title);
        if is_free(&base) {
            return base;
        }
        let slug = safe_title(title);
        (2u32..)
            .map(|n| {
                self.dir
                    .join(format!("{}_{}-{}.{}", id, slug, n, RECORD_EXT))
            })
            .find(is_free)
            .unwrap_or(base)
    }

    /// Record files whose name starts with `{id}_`, in file-name order.
    /// Candidates only; ownership is checked against the stored id.
    fn record_paths(&self, id: &str) -> Vec<PathBuf> {
        let prefix = format!("{}_", id);
        self.all_record_paths()
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&prefix))
            })
            .collect()
    }

    fn all_record_paths(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(RECORD_EXT))
            })
            .collect()
    }

    /// Records whose stored `id` is exactly `id`. The file-name prefix only
    /// narrows the scan: `a_b_x.json` starts with `a_` but belongs to `a_b`.
    /// Unreadable files cannot be attributed and are left alone.
    async fn owned_records(&self, id: &str) -> Result<Vec<(PathBuf, ProjectSummary)>, HistoryError> {
        let mut owned = Vec::new();
        for path in self.record_paths(id) {
            match read_record::<ProjectSummary>(&path).await {
                Ok(summary) if summary.id == id => owned.push((path, summary)),
                Ok(_) => {}
                Err(err @ HistoryError::CorruptRecord { .. }) => {
                    logw(format!("Ignoring unreadable record for {}: {}", id, err));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(owned)
    }

    /// Unix milliseconds, strictly increasing within the process and never
    /// colliding with an id already on disk.
    fn issue_id(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let mut candidate = match LAST_ISSUED_ID.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        }) {
            Ok(last) | Err(last) => now.max(last + 1),
        };

        while !self.record_paths(&candidate.to_string()).is_empty() {
            candidate += 1;
            LAST_ISSUED_ID.fetch_max(candidate, Ordering::SeqCst);
        }
        candidate.to_string()
    }
}

/// Keeps alphanumerics, spaces, `-` and `_`, trimmed and cut to 20 characters.
pub fn safe_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let slug: String = kept.trim().chars().take(TITLE_SLUG_MAX_CHARS).collect();
    if slug.is_empty() {
        "Untitled".to_string()
    } else {
        slug
    }
}

async fn read_record<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, HistoryError> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| HistoryError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| HistoryError::CorruptRecord {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes next to the target and renames over it.
async fn write_atomic(target: &Path, data: &[u8]) -> Result<(), HistoryError> {
    let mut tmp_name = target.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    fs::write(&tmp, data)
        .await
        .map_err(|e| HistoryError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, target).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(HistoryError::io(target, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_title_strips_and_truncates() {
        assert_eq!(safe_title("Hello, World!"), "Hello World");
        assert_eq!(safe_title("  ?!  "), "Untitled");
        assert_eq!(safe_title("A very long title that keeps going"), "A very long title th");
        assert_eq!(safe_title("复仇：第一章"), "复仇第一章");
    }

    #[tokio::test]
    async fn issued_ids_are_strictly_increasing() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = HistoryStore::open(dir.path()).await.unwrap();
        let a: u64 = store.issue_id().parse().unwrap();
        let b: u64 = store.issue_id().parse().unwrap();
        assert!(b > a);
    }
}
