use ai_series_shorts::api::openai::OpenAiClient;
use ai_series_shorts::api::whisper::Transcriber;
use ai_series_shorts::config::Config;
use ai_series_shorts::content::Content;
use ai_series_shorts::export::export_session;
use ai_series_shorts::generator::SeriesWriter;
use ai_series_shorts::history::HistoryStore;
use ai_series_shorts::init;
use ai_series_shorts::session::SessionState;
use ai_series_shorts::source::{StoryResolver, StorySource};
use ai_series_shorts::studio::Studio;
use anyhow::{Context, Result};
use std::path::PathBuf;

const USAGE: &str = "usage: ai-series-cli [--json] [--out DIR] (--theme \"keywords\" | <story.txt | video file | share link>)";

struct Args {
    theme: Option<String>,
    input: Option<String>,
    structured: bool,
    out_dir: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        theme: None,
        input: None,
        structured: false,
        out_dir: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => args.structured = true,
            "--theme" => args.theme = Some(iter.next().context(USAGE)?),
            "--out" => args.out_dir = Some(iter.next().context(USAGE)?),
            _ => args.input = Some(arg),
        }
    }
    if args.theme.is_none() && args.input.is_none() {
        anyhow::bail!(USAGE);
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = parse_args()?;
    let cfg = Config::discover().await?;
    init::ensure_directories(&cfg).await?;

    let history = HistoryStore::open(&cfg.history_dir).await?;
    let writer = SeriesWriter::new(OpenAiClient::new(&cfg)?)
        .structured(args.structured)
        .temperature(cfg.temperature);
    let studio = Studio::new(writer, history);

    let mut state = SessionState::new();
    let from_theme = args.theme.is_some();
    if let Some(theme) = &args.theme {
        state = studio.write_original_story(&state, theme).await?;
    } else if let Some(raw) = &args.input {
        if !init::check_ffmpeg().await {
            eprintln!("[WARNING] FFmpeg not found in PATH. Video inputs will fail.");
        }
        let resolver = StoryResolver::new(Transcriber::new(&cfg)?);
        match resolver.resolve(&StorySource::classify(raw)).await {
            Ok(text) => state = state.with_story(Content::Text(text)),
            Err(err) => {
                eprintln!("{}", err);
                std::process::exit(1);
            }
        }
    }

    let story = state.story_content.clone();
    let state = studio.start_series(&state, story).await?;
    println!("{}", state.series_plan.render_markdown());
    if let Some(first) = state.episode_contents.get(&1) {
        println!("\n{}\n{}", state.episode_banner(1), first.render_markdown());
    }

    let out_dir: PathBuf = args
        .out_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.output_dir.clone());
    export_session(&state, &out_dir, from_theme).await?;
    if let Some(id) = &state.project_id {
        println!("\nSaved as project {} in {}", id, cfg.history_dir.display());
    }
    Ok(())
}
