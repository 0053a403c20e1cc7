//! Tests for the on-disk project history.

use ai_series_shorts::content::Content;
use ai_series_shorts::history::HistoryStore;
use ai_series_shorts::session::SessionState;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn record_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".json"))
        .collect();
    names.sort();
    names
}

fn sample_state(story: &str) -> SessionState {
    SessionState::new()
        .with_story(Content::from(story))
        .with_outline(Content::Structured(json!({
            "series_outline": [
                {"episode_number": 1, "title": "Pilot", "summary": "It begins"},
                {"episode_number": 2, "title": "Fallout", "summary": "It spreads"}
            ]
        })))
        .with_episode(1, Content::from("# Episode 1\nEnglish...\n---\n中文..."))
        .with_episode(2, Content::Structured(json!({"english_script": "Hi", "chinese_translation": "你好"})))
}

#[tokio::test]
async fn test_save_then_load_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();
    let state = sample_state("Hello World\nThe rest of the story.");

    let id = store.save(&state, None).await.unwrap().unwrap();
    let project = store.load(&id).await.unwrap().unwrap();

    assert_eq!(project.id, id);
    assert_eq!(project.title, "Hello World");
    assert_eq!(project.story_content, state.story_content);
    assert_eq!(project.series_plan, state.series_plan);
    assert_eq!(project.episode_contents, state.episode_contents);
    assert_eq!(project.next_episode_to_generate, 3);

    let files = record_files(temp_dir.path());
    assert_eq!(files, vec![format!("{}_Hello World.json", id)]);
}

#[tokio::test]
async fn test_empty_story_is_not_saved() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();

    let result = store.save(&SessionState::new(), None).await.unwrap();
    assert_eq!(result, None);

    let result = store
        .save(&SessionState::new().with_story(Content::from("  ")), Some("42"))
        .await
        .unwrap();
    assert_eq!(result.as_deref(), Some("42"));
    assert!(record_files(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_retitle_keeps_single_record() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();

    let first = SessionState::new().with_story(Content::from("First title"));
    let id = store.save(&first, None).await.unwrap().unwrap();

    let second = first.with_story(Content::from("Second title"));
    let same = store.save(&second, Some(&id)).await.unwrap().unwrap();
    assert_eq!(same, id);

    let files = record_files(temp_dir.path());
    assert_eq!(files, vec![format!("{}_Second title.json", id)]);

    let project = store.load(&id).await.unwrap().unwrap();
    assert_eq!(project.title, "Second title");
}

#[tokio::test]
async fn test_updated_at_never_goes_backwards() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();
    let state = SessionState::new().with_story(Content::from("Clockwork"));

    let id = store.save(&state, None).await.unwrap().unwrap();
    let first = store.load(&id).await.unwrap().unwrap().updated_at;
    store.save(&state, Some(&id)).await.unwrap();
    let second = store.load(&id).await.unwrap().unwrap().updated_at;

    assert!(second >= first);
}

#[tokio::test]
async fn test_load_missing_is_absent() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();
    assert!(store.load("123456").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_removes_and_tolerates_unknown() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();

    let id = store
        .save(&sample_state("Doomed"), None)
        .await
        .unwrap()
        .unwrap();
    store.delete(&id).await.unwrap();
    assert!(store.load(&id).await.unwrap().is_none());
    assert!(record_files(temp_dir.path()).is_empty());

    store.delete(&id).await.unwrap();
    store.delete("does-not-exist").await.unwrap();
}

#[tokio::test]
async fn test_list_orders_by_most_recent_save() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();

    let old = SessionState::new().with_story(Content::from("Old story"));
    let old_id = store.save(&old, None).await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let new = SessionState::new().with_story(Content::from("New story"));
    let new_id = store.save(&new, None).await.unwrap().unwrap();

    let listed: Vec<String> = store.list().await.unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(listed, vec![new_id.clone(), old_id.clone()]);

    tokio::time::sleep(Duration::from_millis(10)).await;
    store.save(&old, Some(&old_id)).await.unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed[0].id, old_id);
    assert_eq!(listed[0].title, "Old story");
    assert_eq!(listed[1].id, new_id);
}

#[tokio::test]
async fn test_corrupt_record_is_skipped_and_absent() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();

    let good = store
        .save(&sample_state("Survivor"), None)
        .await
        .unwrap()
        .unwrap();
    std::fs::write(temp_dir.path().join("999_Broken.json"), "{ not json").unwrap();
    std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, good);

    assert!(store.load("999").await.unwrap().is_none());
}

#[tokio::test]
async fn test_string_keys_on_disk_load_as_integers() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();

    let raw = r#"{
  "id": "1700000000",
  "title": "Legacy",
  "updated_at": "2024-11-02T09:15:00.250000",
  "story_content": "Legacy",
  "series_plan": "1. Episode 1: Start",
  "episode_contents": {"1": "one", "3": "three"},
  "next_episode_to_generate": 4
}"#;
    std::fs::write(temp_dir.path().join("1700000000_Legacy.json"), raw).unwrap();

    let project = store.load("1700000000").await.unwrap().unwrap();
    let keys: Vec<u32> = project.episode_contents.keys().copied().collect();
    assert_eq!(keys, vec![1, 3]);

    let on_disk = std::fs::read_to_string(temp_dir.path().join("1700000000_Legacy.json")).unwrap();
    assert!(on_disk.contains("\"1\": \"one\""));
}

#[tokio::test]
async fn test_saved_file_keeps_unicode_and_string_keys() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();
    let state = SessionState::new()
        .with_story(Content::from("复仇的开始"))
        .with_episode(2, Content::from("第二集"));

    let id = store.save(&state, None).await.unwrap().unwrap();
    let path = temp_dir.path().join(format!("{}_复仇的开始.json", id));
    let body = std::fs::read_to_string(path).unwrap();

    assert!(body.contains("\"2\": \"第二集\""));
    assert!(body.contains("\"next_episode_to_generate\": 3"));
}

#[tokio::test]
async fn test_ids_sharing_a_prefix_stay_separate() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();

    let other = SessionState::new().with_story(Content::from("Other project"));
    store.save(&other, Some("a_b")).await.unwrap();
    let mine = SessionState::new().with_story(Content::from("Mine"));
    store.save(&mine, Some("a")).await.unwrap();

    let kept = store.load("a_b").await.unwrap().unwrap();
    assert_eq!(kept.story_content, Content::from("Other project"));
    assert_eq!(store.load("a").await.unwrap().unwrap().title, "Mine");

    let mut ids: Vec<String> = store.list().await.unwrap().into_iter().map(|p| p.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["a".to_string(), "a_b".to_string()]);

    store.delete("a").await.unwrap();
    assert!(store.load("a").await.unwrap().is_none());
    assert!(store.load("a_b").await.unwrap().is_some());
}

#[tokio::test]
async fn test_title_slug_never_overwrites_another_project() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();

    store
        .save(&SessionState::new().with_story(Content::from("x")), Some("a_b"))
        .await
        .unwrap();
    // `a` + `b_x` names the same file as `a_b` + `x`.
    store
        .save(&SessionState::new().with_story(Content::from("b_x")), Some("a"))
        .await
        .unwrap();

    assert_eq!(store.load("a_b").await.unwrap().unwrap().title, "x");
    assert_eq!(store.load("a").await.unwrap().unwrap().title, "b_x");
    assert_eq!(record_files(temp_dir.path()).len(), 2);
}

#[tokio::test]
async fn test_leftover_duplicate_record_resolves_to_newest() {
    let temp_dir = TempDir::new().unwrap();
    let store = HistoryStore::open(temp_dir.path()).await.unwrap();

    let record = |title: &str, updated_at: &str| {
        format!(
            r#"{{"id": "77", "title": "{title}", "updated_at": "{updated_at}", "story_content": "{title}"}}"#
        )
    };
    std::fs::write(
        temp_dir.path().join("77_Alpha stale.json"),
        record("Alpha stale", "2024-01-01T08:00:00"),
    )
    .unwrap();
    std::fs::write(
        temp_dir.path().join("77_Zulu fresh.json"),
        record("Zulu fresh", "2024-01-02T08:00:00"),
    )
    .unwrap();

    let project = store.load("77").await.unwrap().unwrap();
    assert_eq!(project.title, "Zulu fresh");

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Zulu fresh");

    let state = SessionState::from_project(project);
    store.save(&state, Some("77")).await.unwrap();
    assert_eq!(record_files(temp_dir.path()), vec!["77_Zulu fresh.json".to_string()]);
}
