use ai_series_shorts::api::openai::OpenAiClient;
use ai_series_shorts::api::whisper::Transcriber;
use ai_series_shorts::config::Config;
use ai_series_shorts::content::Content;
use ai_series_shorts::export::export_session;
use ai_series_shorts::generator::SeriesWriter;
use ai_series_shorts::history::HistoryStore;
use ai_series_shorts::init;
use ai_series_shorts::project::{ProjectSummary, SERIES_EPISODES};
use ai_series_shorts::session::SessionState;
use ai_series_shorts::source::{StoryResolver, StorySource};
use ai_series_shorts::studio::Studio;
use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type Input = Lines<BufReader<Stdin>>;

const MENU: &str = "
 1. New project            6. Start series (outline + episode 1)
 2. History                7. Generate outline
 3. Open project           8. Generate next episode
 4. Delete project         9. Show outline and episodes
 5. Set story             10. Export files
 q. Quit";

fn prompt(label: &str) {
    print!("{}", label);
    let _ = std::io::stdout().flush();
}

async fn ask(input: &mut Input, label: &str) -> Result<Option<String>> {
    prompt(label);
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

/// Reads pasted lines until a line holding a single `.`.
async fn ask_block(input: &mut Input) -> Result<String> {
    println!("Paste the story, then finish with a line containing only '.':");
    let mut text = String::new();
    while let Some(line) = input.next_line().await? {
        if line.trim() == "." {
            break;
        }
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}

async fn pick_project(input: &mut Input, projects: &[ProjectSummary]) -> Result<Option<String>> {
    if projects.is_empty() {
        println!("No saved projects yet.");
        return Ok(None);
    }
    print_history(projects, None);
    let choice = ask(input, "Project number: ").await?.unwrap_or_default();
    Ok(choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| projects.get(idx))
        .map(|p| p.id.clone()))
}

fn print_history(projects: &[ProjectSummary], active: Option<&str>) {
    for (idx, project) in projects.iter().enumerate() {
        let marker = if active == Some(project.id.as_str()) { "*" } else { " " };
        println!(
            "{}{:>3}. {}  ({})",
            marker,
            idx + 1,
            project.title,
            project.updated_at.format("%m-%d %H:%M")
        );
    }
}

fn print_status(state: &SessionState) {
    let title = if state.has_story() {
        state.story_content.derive_title()
    } else {
        "(no story yet)".to_string()
    };
    println!(
        "\nProject: {}  |  outline: {}  |  episodes: {}/{}",
        title,
        if state.has_outline() { "yes" } else { "no" },
        state.episode_contents.len(),
        SERIES_EPISODES
    );
    if let Some(notice) = &state.notice {
        println!("! {}", notice);
    }
}

fn print_results(state: &SessionState) {
    if !state.has_outline() {
        println!("No outline yet.");
        return;
    }
    println!("\n=== Series outline ===\n{}", state.series_plan.render_markdown());
    for (episode, content) in &state.episode_contents {
        println!("\n=== Episode {} ===", episode);
        println!("{}", state.episode_banner(*episode));
        println!("{}", content.render_markdown());
    }
    if state.is_complete() {
        println!("\nSeries complete.");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::discover().await?;
    init::ensure_directories(&cfg).await?;
    if !init::check_ffmpeg().await {
        eprintln!("[WARNING] FFmpeg not found in PATH. Video inputs will be unavailable.");
    }

    let history = HistoryStore::open(&cfg.history_dir)
        .await
        .context("Failed to open project history")?;
    let writer = SeriesWriter::new(OpenAiClient::new(&cfg)?).temperature(cfg.temperature);
    let studio = Studio::new(writer, history);
    let resolver = StoryResolver::new(Transcriber::new(&cfg)?);

    println!("=== AI short-drama script studio ===");
    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();
    let mut state = SessionState::new();
    let mut story_from_theme = false;

    loop {
        print_status(&state);
        println!("{}", MENU);
        let Some(choice) = ask(&mut input, "> ").await? else {
            break;
        };

        let next = match choice.as_str() {
            "q" | "Q" => break,
            "1" => {
                story_from_theme = false;
                Ok(SessionState::new())
            }
            "2" => {
                let projects = studio.projects().await?;
                if projects.is_empty() {
                    println!("No saved projects yet.");
                }
                print_history(&projects, state.project_id.as_deref());
                Ok(state.clone())
            }
            "3" => {
                let projects = studio.projects().await?;
                match pick_project(&mut input, &projects).await? {
                    Some(id) => match studio.open(&id).await {
                        Ok(Some(loaded)) => {
                            story_from_theme = false;
                            Ok(loaded)
                        }
                        Ok(None) => Ok(state.with_notice("That project could not be loaded.")),
                        Err(err) => Err(err),
                    },
                    None => Ok(state.clone()),
                }
            }
            "4" => {
                let projects = studio.projects().await?;
                match pick_project(&mut input, &projects).await? {
                    Some(id) => studio.delete(&state, &id).await,
                    None => Ok(state.clone()),
                }
            }
            "5" => {
                let mode = ask(&mut input, "Source: [t]ext, [f]ile/link, or t[h]eme: ")
                    .await?
                    .unwrap_or_default();
                match mode.as_str() {
                    "h" => {
                        let theme = ask(&mut input, "Theme or keywords: ").await?.unwrap_or_default();
                        story_from_theme = true;
                        studio.write_original_story(&state, &theme).await
                    }
                    "f" => {
                        let raw = ask(&mut input, "File path or share link: ").await?.unwrap_or_default();
                        match resolver.resolve(&StorySource::classify(&raw)).await {
                            Ok(text) => {
                                story_from_theme = false;
                                studio.set_story(&state, Content::Text(text)).await
                            }
                            Err(err) => Ok(state.with_notice(err.to_string())),
                        }
                    }
                    _ => {
                        let text = ask_block(&mut input).await?;
                        match resolver.resolve(&StorySource::Text(text)).await {
                            Ok(text) => {
                                story_from_theme = false;
                                studio.set_story(&state, Content::Text(text)).await
                            }
                            Err(err) => Ok(state.with_notice(err.to_string())),
                        }
                    }
                }
            }
            "6" => {
                let story = state.story_content.clone();
                studio.start_series(&state, story).await
            }
            "7" => studio.generate_outline(&state).await,
            "8" => studio.generate_next_episode(&state).await,
            "9" => {
                print_results(&state);
                Ok(state.clone())
            }
            "10" => {
                match export_session(&state, &cfg.output_dir, story_from_theme).await {
                    Ok(paths) => {
                        for path in paths {
                            println!("  {}", path.display());
                        }
                    }
                    Err(err) => eprintln!("Export failed: {:#}", err),
                }
                Ok(state.clone())
            }
            _ => {
                println!("Unknown option");
                Ok(state.clone())
            }
        };

        state = match next {
            Ok(next) => next,
            Err(err) => state.with_notice(err.to_string()),
        };
    }

    Ok(())
}
