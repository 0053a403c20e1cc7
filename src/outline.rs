//! Best-effort extraction of per-episode summaries from a series outline.
//!
//! Nothing here fails: unparsable entries are dropped and the caller shows a
//! placeholder for episodes without a summary.

use crate::content::Content;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable";

static EPISODE_MARKER: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:#{1,6}[ \t]*)?(?:\d+[.)][ \t]*)?(?:\*\*)?[ \t]*episode[ \t]+([^\s:：*]+)(?:\*\*)?[ \t]*(?:[:：\-–][ \t]*)?(.*)$",
    )
    .ok()
});

/// Episode number to summary for every episode the outline describes.
pub fn parse_episode_summaries(plan: &Content) -> BTreeMap<u32, String> {
    match plan {
        Content::Structured(value) => parse_structured(value),
        Content::Text(text) => match serde_json::from_str::<Value>(text.trim()) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => parse_structured(&value),
            _ => parse_text(text),
        },
    }
}

/// Summary for one episode, or the placeholder.
pub fn summary_or_placeholder(summaries: &BTreeMap<u32, String>, episode: u32) -> &str {
    summaries
        .get(&episode)
        .map(String::as_str)
        .unwrap_or(SUMMARY_UNAVAILABLE)
}

fn parse_structured(value: &Value) -> BTreeMap<u32, String> {
    let entries = match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => ["series_outline", "episodes", "outline"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array)),
        _ => None,
    };

    let mut summaries = BTreeMap::new();
    for entry in entries.into_iter().flatten() {
        let Some(number) = entry.get("episode_number").and_then(episode_number) else {
            continue;
        };
        let summary = ["summary", "title"]
            .iter()
            .find_map(|key| entry.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|text| !text.is_empty());
        if let Some(summary) = summary {
            summaries.insert(number, summary.to_string());
        }
    }
    summaries
}

fn episode_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn parse_text(text: &str) -> BTreeMap<u32, String> {
    let mut summaries = BTreeMap::new();
    let Some(marker) = EPISODE_MARKER.as_ref() else {
        return summaries;
    };

    let markers: Vec<_> = marker.captures_iter(text).collect();
    for (idx, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(index)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(number) = index.as_str().trim_end_matches(['.', ')']).parse::<u32>() else {
            continue;
        };

        let body_end = markers
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        let body = text[whole.end()..body_end].trim();
        let inline = caps.get(2).map_or("", |m| m.as_str().trim());

        let summary = if body.is_empty() { inline } else { body };
        if !summary.is_empty() {
            summaries.insert(number, summary.to_string());
        }
    }
    summaries
}
