use serde::{Deserialize, Serialize};
use serde_json::Value;

const TITLE_MAX_CHARS: usize = 30;
const ANALYSIS_PLACEHOLDER: &str = "Story Analysis";

/// Generated or resolved content: either free text or a structured JSON value.
///
/// Stored untagged, so a JSON string reads back as `Text` and any other JSON
/// value as `Structured`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Structured(Value),
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Content::Text(text),
            other => Content::Structured(other),
        }
    }
}

impl Content {
    /// Parses a model reply that was requested as JSON. Replies that are not
    /// valid JSON are kept verbatim as text.
    pub fn from_model_reply(raw: &str) -> Self {
        let trimmed = strip_code_fence(raw);
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => Content::Structured(value),
            _ => Content::Text(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(text) => text.trim().is_empty(),
            Content::Structured(Value::Null) => true,
            Content::Structured(Value::Object(map)) => map.is_empty(),
            Content::Structured(Value::Array(items)) => items.is_empty(),
            Content::Structured(Value::String(text)) => text.trim().is_empty(),
            Content::Structured(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Structured(_) => None,
        }
    }

    /// Display title used for the history list and the storage file name.
    pub fn derive_title(&self) -> String {
        if self.is_empty() {
            return "Untitled Project".to_string();
        }

        match self {
            Content::Text(text) => {
                let first_line = text.trim().lines().next().unwrap_or_default();
                first_line.chars().take(TITLE_MAX_CHARS).collect()
            }
            Content::Structured(Value::Object(map)) => {
                let title = map.get("title").and_then(Value::as_str).unwrap_or_default();
                if !title.is_empty() && title != ANALYSIS_PLACEHOLDER {
                    return title.to_string();
                }
                map.get("theme")
                    .and_then(Value::as_str)
                    .filter(|theme| !theme.is_empty())
                    .unwrap_or(ANALYSIS_PLACEHOLDER)
                    .to_string()
            }
            Content::Structured(_) => "Story Project".to_string(),
        }
    }

    /// Serialization used when the content is embedded in a prompt.
    pub fn to_prompt_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    /// Markdown rendering for display and export.
    pub fn render_markdown(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Structured(value) => {
                let mut out = String::new();
                render_value(value, 2, &mut out);
                out.trim_end().to_string()
            }
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn render_value(value: &Value, depth: usize, out: &mut String) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                let heading = "#".repeat(depth.min(6));
                out.push_str(&format!("{} {}\n\n", heading, humanize_key(key)));
                render_value(inner, depth + 1, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(_) | Value::Array(_) => {
                        render_value(item, depth, out);
                    }
                    scalar => {
                        out.push_str("- ");
                        out.push_str(&scalar_text(scalar));
                        out.push('\n');
                    }
                }
            }
            out.push('\n');
        }
        scalar => {
            out.push_str(&scalar_text(scalar));
            out.push_str("\n\n");
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn humanize_key(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
