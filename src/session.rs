use crate::content::Content;
use crate::outline;
use crate::project::{EpisodeMap, Project, SERIES_EPISODES, first_episode};
use std::collections::BTreeMap;

/// Working copy of the project being edited.
///
/// Transitions take `&self` and return a new state, so a failed operation
/// leaves the caller holding the previous state unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub project_id: Option<String>,
    pub story_content: Content,
    pub series_plan: Content,
    pub episode_contents: EpisodeMap,
    pub next_episode_to_generate: u32,
    /// Last user-facing failure message. Never persisted.
    pub notice: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            project_id: None,
            story_content: Content::default(),
            series_plan: Content::default(),
            episode_contents: EpisodeMap::new(),
            next_episode_to_generate: first_episode(),
            notice: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every field from a stored project.
    pub fn from_project(project: Project) -> Self {
        Self {
            project_id: Some(project.id),
            story_content: project.story_content,
            series_plan: project.series_plan,
            episode_contents: project.episode_contents,
            next_episode_to_generate: project.next_episode_to_generate,
            notice: None,
        }
    }

    pub fn has_story(&self) -> bool {
        !self.story_content.is_empty()
    }

    pub fn has_outline(&self) -> bool {
        !self.series_plan.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.next_episode_to_generate > SERIES_EPISODES
    }

    pub fn latest_episode(&self) -> Option<u32> {
        self.episode_contents.keys().next_back().copied()
    }

    /// Episode to offer next: one past the latest generated, capped at the series length.
    pub fn next_episode(&self) -> Option<u32> {
        let next = self.latest_episode().map_or(1, |n| n + 1);
        (next <= SERIES_EPISODES).then_some(next)
    }

    pub fn episode_summaries(&self) -> BTreeMap<u32, String> {
        outline::parse_episode_summaries(&self.series_plan)
    }

    /// Line shown above an episode: its outline summary or a placeholder.
    pub fn episode_banner(&self, episode: u32) -> String {
        let summaries = self.episode_summaries();
        format!(
            "Episode {} Summary: {}",
            episode,
            outline::summary_or_placeholder(&summaries, episode)
        )
    }

    pub fn with_project_id(&self, id: Option<String>) -> Self {
        Self {
            project_id: id,
            ..self.clone()
        }
    }

    pub fn with_story(&self, story: Content) -> Self {
        Self {
            story_content: story,
            notice: None,
            ..self.clone()
        }
    }

    pub fn with_outline(&self, plan: Content) -> Self {
        Self {
            series_plan: plan,
            notice: None,
            ..self.clone()
        }
    }

    /// Records episode `number` and advances the pointer past it.
    pub fn with_episode(&self, number: u32, content: Content) -> Self {
        let mut episode_contents = self.episode_contents.clone();
        episode_contents.insert(number, content);
        Self {
            episode_contents,
            next_episode_to_generate: number + 1,
            notice: None,
            ..self.clone()
        }
    }

    /// Clears generated episodes ahead of regenerating a series from scratch.
    pub fn with_episodes_reset(&self) -> Self {
        Self {
            episode_contents: EpisodeMap::new(),
            next_episode_to_generate: first_episode(),
            ..self.clone()
        }
    }

    pub fn with_notice(&self, message: impl Into<String>) -> Self {
        Self {
            notice: Some(message.into()),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_transition_advances_pointer() {
        let state = SessionState::new()
            .with_story(Content::from("story"))
            .with_outline(Content::from("plan"));
        let after = state.with_episode(1, Content::from("ep1"));

        assert_eq!(after.next_episode_to_generate, 2);
        assert_eq!(after.latest_episode(), Some(1));
        assert_eq!(after.next_episode(), Some(2));
        assert!(state.episode_contents.is_empty());
    }

    #[test]
    fn series_completes_after_tenth_episode() {
        let mut state = SessionState::new().with_story(Content::from("story"));
        for n in 1..=10 {
            state = state.with_episode(n, Content::from(format!("ep{n}")));
        }
        assert!(state.is_complete());
        assert_eq!(state.next_episode_to_generate, 11);
        assert_eq!(state.next_episode(), None);
    }

    #[test]
    fn notice_is_cleared_by_new_content() {
        let state = SessionState::new().with_notice("Error: boom");
        assert_eq!(state.notice.as_deref(), Some("Error: boom"));
        assert!(state.with_story(Content::from("x")).notice.is_none());
    }
}
