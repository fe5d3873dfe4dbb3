//! chaptertune - book chapters to music playlists
//!
//! Reads a book title, free-text notes and music preferences (command line,
//! saved preset, or interactive prompt), then creates one private playlist
//! per chapter. Logs go to stderr (or the configured file); playlist URLs are
//! printed to stdout.

use anyhow::{bail, Context, Result};
use chaptertune::config::AppConfig;
use chaptertune::models::{RunInputs, VocalPreference};
use chaptertune::presets::PresetStore;
use chaptertune::services::{OpenAiClient, SpotifyClient};
use chaptertune::workflow::{Pipeline, PipelineEvent};
use chaptertune::PipelineError;
use chaptertune_common::config::{load_toml_config, resolve_config_path, TomlConfig};
use chaptertune_common::logging::init_tracing;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Command-line arguments for chaptertune
#[derive(Parser, Debug)]
#[command(name = "chaptertune")]
#[command(about = "Create one music playlist per book chapter")]
#[command(version)]
struct Args {
    /// Book title
    #[arg(short, long)]
    title: Option<String>,

    /// Comments and chapter summaries for the book
    #[arg(short, long)]
    notes: Option<String>,

    /// Music preferences (genres, moods, artists)
    #[arg(short, long)]
    preferences: Option<String>,

    /// Vocal preference: (v)ocal, (i)nstrumental or (b)oth
    #[arg(long)]
    vocal: Option<VocalPreference>,

    /// Minimum instrumentalness (0.0-1.0), overrides the vocal preference
    #[arg(long, value_parser = parse_unit_interval)]
    min_instrumentalness: Option<f64>,

    /// Text model name
    #[arg(long)]
    model: Option<String>,

    /// TOML config file
    #[arg(short, long, env = "CHAPTERTUNE_CONFIG")]
    config: Option<PathBuf>,

    /// Start from a saved preset
    #[arg(long)]
    preset: Option<String>,

    /// Save the run inputs as a preset before running
    #[arg(long)]
    save_preset: Option<String>,

    /// List saved presets and exit
    #[arg(long)]
    list_presets: bool,
}

fn parse_unit_interval(value: &str) -> std::result::Result<f64, String> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if (0.0..=1.0).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!("{} is outside 0.0..=1.0", parsed))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path).context("Failed to load configuration")?,
        None => TomlConfig::default(),
    };

    init_tracing(&toml_config.logging).context("Failed to initialise logging")?;

    info!(
        "Starting chaptertune v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => warn!("No config directory available; using environment and defaults"),
    }

    let presets = PresetStore::default_location();

    if args.list_presets {
        for name in presets.list().context("Failed to list presets")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let inputs = collect_inputs(&args, &presets)?;

    if let Some(name) = &args.save_preset {
        let path = presets.save(name, &inputs).context("Failed to save preset")?;
        println!("Saved preset '{}' to {}", name, path.display());
    }

    // Fatal initialisation: configuration and clients
    let app_config = AppConfig::resolve(&toml_config, args.model.as_deref())
        .map_err(PipelineError::from)
        .context("Configuration incomplete")?;
    app_config.log_effective();

    let music_service = SpotifyClient::connect(&app_config.spotify)
        .await
        .map_err(|e| PipelineError::FatalInit(format!("Spotify: {}", e)))
        .context("Failed to connect to Spotify")?;

    let generator = OpenAiClient::new(
        &app_config.openai.api_base,
        app_config.openai.api_key.clone(),
        app_config.openai.model.clone(),
    )
    .map_err(|e| PipelineError::FatalInit(format!("OpenAI: {}", e)))
    .context("Failed to create text model client")?;

    let (event_tx, event_rx) = mpsc::channel(32);
    let progress = tokio::spawn(print_progress(event_rx));

    let pipeline = Pipeline::new(
        app_config.pipeline.clone(),
        Arc::new(generator),
        Arc::new(music_service),
    )
    .with_events(event_tx);

    let result = pipeline.run(&inputs).await;
    drop(pipeline);
    if let Err(e) = progress.await {
        warn!("Progress reporter stopped: {}", e);
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Run aborted");
            return Err(e).context("Run aborted");
        }
    };

    info!(
        book = %summary.book_title,
        created = summary.created.len(),
        skipped = summary.skipped.len(),
        duration_ms = summary.duration_ms(),
        "Run complete"
    );
    for skipped in &summary.skipped {
        warn!(chapter = skipped.chapter, reason = %skipped.reason, "Chapter skipped");
    }

    println!();
    println!("Playlists for \"{}\":", summary.book_title);
    for created in &summary.created {
        println!("  Chapter {}: {}", created.chapter, created.url);
    }
    if !summary.skipped.is_empty() {
        println!("Skipped chapters: {}", summary.skipped.len());
    }

    Ok(())
}

/// Merge preset, command-line values and interactive answers
fn collect_inputs(args: &Args, presets: &PresetStore) -> Result<RunInputs> {
    let preset = match &args.preset {
        Some(name) => Some(
            presets
                .load(name)
                .with_context(|| format!("Failed to load preset '{}'", name))?,
        ),
        None => None,
    };

    let book_title = match args.title.clone().or_else(|| preset.as_ref().map(|p| p.book_title.clone())) {
        Some(title) => title,
        None => prompt("Enter the book title: ")?,
    };
    if book_title.trim().is_empty() {
        bail!("A book title is required");
    }

    let notes = match args.notes.clone().or_else(|| preset.as_ref().map(|p| p.notes.clone())) {
        Some(notes) => notes,
        None => prompt("Enter your comments and chapter summaries: ")?,
    };

    let music_preferences = match args
        .preferences
        .clone()
        .or_else(|| preset.as_ref().map(|p| p.music_preferences.clone()))
    {
        Some(prefs) => prefs,
        None => prompt("Enter your music preferences (genres, moods, artists): ")?,
    };

    let vocal_preference = args
        .vocal
        .or_else(|| preset.as_ref().map(|p| p.vocal_preference))
        .unwrap_or_default();

    let min_instrumentalness = args
        .min_instrumentalness
        .or_else(|| preset.as_ref().and_then(|p| p.min_instrumentalness));

    Ok(RunInputs {
        book_title: book_title.trim().to_string(),
        notes,
        music_preferences,
        vocal_preference,
        min_instrumentalness,
    })
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// Print progress events to stdout until the pipeline drops its sender
async fn print_progress(mut event_rx: mpsc::Receiver<PipelineEvent>) {
    while let Some(event) = event_rx.recv().await {
        match event {
            PipelineEvent::ChaptersExtracted { count } => println!("Found {} chapters", count),
            PipelineEvent::ChapterStarted { chapter, total } => {
                println!("Processing chapter {}/{}...", chapter, total)
            }
            PipelineEvent::ChapterCompleted { chapter, url } => {
                println!("Created playlist for chapter {}: {}", chapter, url)
            }
            PipelineEvent::ChapterSkipped { chapter, reason } => {
                println!("Skipped chapter {}: {}", chapter, reason)
            }
            PipelineEvent::RunCompleted { created, skipped } => {
                println!("Done: {} playlists created, {} chapters skipped", created, skipped)
            }
        }
    }
}
