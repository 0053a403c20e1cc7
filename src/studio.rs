//! Session operations: each one takes the current [`SessionState`], talks to
//! the model and the history store, and returns the next state. Any operation
//! that produces content saves immediately.

use crate::content::Content;
use crate::error::{HistoryError, StudioError};
use crate::generator::{GenerationClient, SeriesWriter};
use crate::history::HistoryStore;
use crate::project::{ProjectSummary, SERIES_EPISODES};
use crate::session::SessionState;
use crate::{logi, logok, logw};

pub struct Studio<C> {
    writer: SeriesWriter<C>,
    history: HistoryStore,
}

impl<C: GenerationClient> Studio<C> {
    pub fn new(writer: SeriesWriter<C>, history: HistoryStore) -> Self {
        Self { writer, history }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn writer(&self) -> &SeriesWriter<C> {
        &self.writer
    }

    /// Saves the state under its id, assigning one on first save.
    pub async fn persist(&self, state: &SessionState) -> Result<SessionState, HistoryError> {
        let id = self
            .history
            .save(state, state.project_id.as_deref())
            .await?;
        Ok(state.with_project_id(id))
    }

    /// Sets the story and saves.
    ///
    /// Once an outline or an episode exists the story is fixed for that
    /// project, so a new story starts a new project and the old one stays
    /// stored as it was.
    pub async fn set_story(
        &self,
        state: &SessionState,
        story: Content,
    ) -> Result<SessionState, StudioError> {
        let next = if state.has_outline() || !state.episode_contents.is_empty() {
            logi("New story on a project already in progress; starting a new project.");
            SessionState::new().with_story(story)
        } else {
            state.with_story(story)
        };
        Ok(self.persist(&next).await?)
    }

    /// Writes an original story from a theme and makes it the story content.
    pub async fn write_original_story(
        &self,
        state: &SessionState,
        theme: &str,
    ) -> Result<SessionState, StudioError> {
        if theme.trim().is_empty() {
            return Ok(state.clone());
        }
        let story = self.writer.original_story(theme.trim()).await?;
        self.set_story(state, story).await
    }

    pub async fn generate_outline(&self, state: &SessionState) -> Result<SessionState, StudioError> {
        if !state.has_story() {
            return Ok(state.clone());
        }
        let plan = self.writer.plan_series(&state.story_content).await?;
        if plan.is_empty() {
            logw("Model returned an empty outline; keeping the previous one.");
            return Ok(state.with_notice("The model returned an empty outline."));
        }
        Ok(self.persist(&state.with_outline(plan)).await?)
    }

    pub async fn generate_episode(
        &self,
        state: &SessionState,
        episode: u32,
    ) -> Result<SessionState, StudioError> {
        if !(1..=SERIES_EPISODES).contains(&episode) {
            return Err(StudioError::EpisodeOutOfRange(episode));
        }
        if !state.has_story() {
            return Ok(state.clone());
        }
        if !state.has_outline() {
            return Err(StudioError::MissingOutline);
        }

        let summaries = state.episode_summaries();
        let summary = summaries
            .get(&episode)
            .cloned()
            .unwrap_or_else(|| format!("Episode {}", episode));

        let content = self
            .writer
            .write_episode(episode, &state.story_content, &state.series_plan, &summary)
            .await?;
        Ok(self.persist(&state.with_episode(episode, content)).await?)
    }

    /// Generates the episode after the latest one, if the series is not finished.
    pub async fn generate_next_episode(
        &self,
        state: &SessionState,
    ) -> Result<SessionState, StudioError> {
        match state.next_episode() {
            Some(episode) => self.generate_episode(state, episode).await,
            None => {
                logi("Series complete; nothing left to generate.");
                Ok(state.clone())
            }
        }
    }

    /// Stores the story with any previous outline and episodes cleared, then
    /// produces the outline and episode 1.
    ///
    /// The story is saved before generation starts, so it survives a failure
    /// of either model call; the returned error then carries no state and the
    /// caller should reload the project to pick up the saved story.
    pub async fn start_series(
        &self,
        state: &SessionState,
        story: Content,
    ) -> Result<SessionState, StudioError> {
        if story.is_empty() {
            return Ok(state.clone());
        }
        let seeded = state
            .with_story(story)
            .with_outline(Content::default())
            .with_episodes_reset();
        let seeded = self.persist(&seeded).await?;

        let outlined = self.generate_outline(&seeded).await?;
        if !outlined.has_outline() {
            return Ok(outlined);
        }
        let done = self.generate_episode(&outlined, 1).await?;
        logok("Outline and episode 1 ready");
        Ok(done)
    }

    /// The stored project as a session, or `None` when it does not exist.
    pub async fn open(&self, id: &str) -> Result<Option<SessionState>, StudioError> {
        let project = self.history.load(id).await?;
        Ok(project.map(SessionState::from_project))
    }

    pub async fn projects(&self) -> Result<Vec<ProjectSummary>, StudioError> {
        Ok(self.history.list().await?)
    }

    /// Deletes a project; deleting the active one starts a new session.
    pub async fn delete(&self, state: &SessionState, id: &str) -> Result<SessionState, StudioError> {
        self.history.delete(id).await?;
        if state.project_id.as_deref() == Some(id) {
            Ok(SessionState::new())
        } else {
            Ok(state.clone())
        }
    }
}
