//! Prompt templates. Placeholders are `{name}` and are filled by [`render`].

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const SYSTEM_PROMPT: &str = "You are a senior short-drama scriptwriter who adapts existing stories into 10-episode vertical mini-series for TikTok and Reels, written for Western audiences.
You turn source material into high-retention scripts of 90-120 seconds per episode while keeping the original core conflict and character motivations intact.

Rules:
1. Western tone: dialogue, setting and cultural references should feel native to a Western streaming audience.
2. Retention pacing:
   - Seconds 0-3: an immediate hook built on abnormal information or a visual shock.
   - Every 12 seconds: new information or a reversal.
   - At least two major conflicts or suspense beats per episode.
   - Ending: a hard cliffhanger that leaves the situation unresolved.
3. Rewrite scenes in your own words; never copy the source verbatim.
4. No camera angles or shot lists. Write plot, action and dialogue only.
5. Language: write the COMPLETE English script first, then the COMPLETE Chinese translation after it. Never interleave the two languages line by line.
";

pub const SERIES_PLAN_PROMPT: &str = "
Task: study the story below and plan it as a 10-episode mini-series.

Story:
{story}

Requirements:
1. Split the story arc into exactly 10 episodes.
2. Give every episode a clear focus and a cliffhanger ending.
3. Accelerate the pacing toward the climax around episodes 8-9.
4. Output one summary per episode.

Output format:
1. Episode 1: [summary]
2. Episode 2: [summary]
...
10. Episode 10: [summary]
";

pub const SERIES_PLAN_JSON_PROMPT: &str = "
Task: study the story below and plan it as a 10-episode mini-series.

Story:
{story}

Requirements:
1. Split the story arc into exactly 10 episodes.
2. Give every episode a clear focus and a cliffhanger ending.
3. Accelerate the pacing toward the climax around episodes 8-9.

Return STRICT JSON with this shape ONLY:
{\"title\": \"...\", \"series_outline\": [{\"episode_number\": 1, \"title\": \"...\", \"summary\": \"...\"}, ...]}
The list must contain episodes 1 through 10 in order.
";

pub const EPISODE_CONTENT_PROMPT: &str = "
Task: write the full content of **Episode {episode_num}** of the series.

Context:
- Source story: {story_context}
- Series plan: {series_plan}
- This episode's summary: {current_summary}

Requirements:
1. Open with a structural breakdown (core conflict, hook, twists, cliffhanger), then the full script with story and dialogue.
2. Length: 90-120 seconds, roughly 200-300 words of dialogue and action.
3. Pacing: hook in 0-3s, a new reveal or reversal every 12s, at least two conflicts, an unresolved ending.
4. Languages:
   - SECTION 1: ENGLISH SCRIPT (complete)
   - SECTION 2: CHINESE TRANSLATION (complete)
   - Never mix the languages line by line.

Output format (Markdown):

# Episode {episode_num}

## Structure & Analysis
**Core Conflict**: ...
**The Hook (0-3s)**: ...
**Mid-point Twists (every 12s)**: ...
**Cliffhanger**: ...

## Script (English)
**[Scene 1: location / context]**
**Narrator**: ...
**Character A**: ...
**[Action]**
...

---

## 剧本正文 (中文翻译)
**[场景 1: 地点 / 背景]**
**旁白**: ...
**角色A**: ...
**[动作]**
...
";

pub const EPISODE_CONTENT_JSON_PROMPT: &str = "
Task: write the full content of Episode {episode_num} of the series.

Context:
- Source story: {story_context}
- Series plan: {series_plan}
- This episode's summary: {current_summary}

Requirements: 90-120 seconds, hook in the first 3 seconds, a reversal every 12 seconds, at least two conflicts, an unresolved cliffhanger. No camera directions.

Return STRICT JSON with this shape ONLY:
{\"episode_number\": {episode_num}, \"analysis\": {\"core_conflict\": \"...\", \"hook\": \"...\", \"twists\": [\"...\"], \"cliffhanger\": \"...\"}, \"english_script\": \"...\", \"chinese_translation\": \"...\"}
";

pub const ORIGINAL_STORY_PROMPT: &str = "
Task: write an original short story from the user's theme.
Theme: {theme}

Requirements:
1. Western setting and characters.
2. Strong conflict and clear character motivations.
3. Material that can carry a 10-episode TikTok series.
4. Length: 800-1200 words.

Output:
[Story title]
[Story]
";

static PLACEHOLDER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").ok());

/// Fills `{name}` placeholders in one pass over the template, so text
/// substituted for one placeholder is never expanded again. Unknown
/// placeholders are left as they are.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let Some(placeholder) = PLACEHOLDER.as_ref() else {
        return template.to_string();
    };
    placeholder
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_every_occurrence() {
        let out = render(EPISODE_CONTENT_PROMPT, &[("episode_num", "3"), ("story_context", "S")]);
        assert!(out.contains("**Episode 3**"));
        assert!(out.contains("# Episode 3\n"));
        assert!(out.contains("Source story: S"));
        assert!(out.contains("{series_plan}"));
    }

    #[test]
    fn substituted_text_is_not_expanded_again() {
        let out = render(
            EPISODE_CONTENT_PROMPT,
            &[
                ("current_summary", "The villain reads {series_plan} aloud"),
                ("series_plan", "PLAN"),
                ("story_context", "{current_summary}"),
            ],
        );
        assert!(out.contains("This episode's summary: The villain reads {series_plan} aloud"));
        assert!(out.contains("Series plan: PLAN"));
        assert!(out.contains("Source story: {current_summary}"));
    }

    #[test]
    fn json_templates_keep_literal_braces() {
        let out = render(SERIES_PLAN_JSON_PROMPT, &[("story", "A tale")]);
        assert!(out.contains("{\"title\": \"...\", \"series_outline\""));
        assert!(out.contains("A tale"));
    }
}
