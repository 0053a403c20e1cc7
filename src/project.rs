use crate::content::Content;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const SERIES_EPISODES: u32 = 10;

/// Episode number to content, ordered by episode.
pub type EpisodeMap = BTreeMap<u32, Content>;

/// One persisted story-to-series adaptation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub updated_at: NaiveDateTime,
    #[serde(default)]
    pub story_content: Content,
    #[serde(default)]
    pub series_plan: Content,
    #[serde(default, deserialize_with = "deserialize_episode_map")]
    pub episode_contents: EpisodeMap,
    #[serde(default = "first_episode")]
    pub next_episode_to_generate: u32,
}

/// Entry of the history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    #[serde(default = "untitled")]
    pub title: String,
    pub updated_at: NaiveDateTime,
    #[serde(skip)]
    pub file_path: PathBuf,
}

pub(crate) fn first_episode() -> u32 {
    1
}

fn untitled() -> String {
    "Untitled".to_string()
}

/// JSON object keys are always strings on disk; they are converted back to
/// episode numbers here. A key that is not a number makes the record corrupt.
fn deserialize_episode_map<'de, D>(deserializer: D) -> Result<EpisodeMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Content>> = Option::deserialize(deserializer)?;
    let mut episodes = EpisodeMap::new();
    for (key, content) in raw.unwrap_or_default() {
        let number = key
            .trim()
            .parse::<u32>()
            .map_err(|_| serde::de::Error::custom(format!("invalid episode number key {key:?}")))?;
        episodes.insert(number, content);
    }
    Ok(episodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_keys_become_integers() {
        let raw = r#"{
            "id": "1700000000000",
            "title": "Hello World",
            "updated_at": "2024-05-01T10:20:30.123456",
            "story_content": "Hello World",
            "series_plan": "",
            "episode_contents": {"2": "second", " 1": "first"},
            "next_episode_to_generate": 3
        }"#;
        let project: Project = serde_json::from_str(raw).unwrap();
        let keys: Vec<u32> = project.episode_contents.keys().copied().collect();
        assert_eq!(keys, vec![1, 2]);
        assert_eq!(project.episode_contents[&1], Content::from("first"));
    }

    #[test]
    fn non_numeric_episode_key_is_rejected() {
        let raw = r#"{
            "id": "1",
            "title": "t",
            "updated_at": "2024-05-01T10:20:30",
            "episode_contents": {"pilot": "x"}
        }"#;
        assert!(serde_json::from_str::<Project>(raw).is_err());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let raw = r#"{"id": "9", "title": "t", "updated_at": "2024-05-01T10:20:30"}"#;
        let project: Project = serde_json::from_str(raw).unwrap();
        assert!(project.series_plan.is_empty());
        assert!(project.episode_contents.is_empty());
        assert_eq!(project.next_episode_to_generate, 1);
    }
}
