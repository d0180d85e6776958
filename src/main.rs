//! subgen - video to subtitle pipeline
//!
//! Extracts audio with ffmpeg, transcribes it with whisper.cpp, optionally
//! translates through Ollama, writes SRT and can burn it into the video.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subgen::cli::{Args, Commands, ConfigAction, RunArgs};
use subgen::config::Config;
use subgen::error::SubgenError;
use subgen::media::MediaProcessorFactory;
use subgen::progress::ProgressSink;
use subgen::request::is_supported_video;
use subgen::setup::ModelCatalog;
use subgen::workflow::{find_videos, ArtifactGuard, RunOutcome, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;
    info!("Starting subgen");

    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Commands::Generate { input, run } => {
            if !is_supported_video(&input) {
                warn!("{} does not have a known video extension, trying anyway", input.display());
            }
            let workflow = Workflow::new(&config)?;
            let cancel = cancel_on_ctrl_c();
            generate(&workflow, &input, &run, &config, &cancel).await?;
        }
        Commands::Batch { input_dir, run } => {
            let videos = find_videos(&input_dir)?;
            if videos.is_empty() {
                println!("No video files found in {}", input_dir.display());
                return Ok(());
            }

            let workflow = Workflow::new(&config)?;
            let cancel = cancel_on_ctrl_c();
            let mut failed = 0;

            for (i, video) in videos.iter().enumerate() {
                println!("[{}/{}] {}", i + 1, videos.len(), video.display());
                match generate(&workflow, video, &run, &config, &cancel).await {
                    Ok(RunOutcome::Cancelled) => break,
                    Ok(RunOutcome::Completed(_)) => {}
                    Err(e) => {
                        error!("Failed to process {}: {}", video.display(), e);
                        failed += 1;
                    }
                }
            }

            if failed > 0 {
                println!("{} of {} files failed, see the log for details", failed, videos.len());
            }
        }
        Commands::Models { download, all } => {
            let catalog = ModelCatalog::new(&config.transcriber.models_dir)?;

            if let Some(size) = download {
                catalog.download(size).await?;
            } else if all {
                for model in catalog.list().iter().filter(|m| !m.downloaded) {
                    catalog.download(model.size).await?;
                }
            }

            println!("\nWhisper models in {}:", catalog.models_dir().display());
            println!("{:<8} {:<20} {:<12} {:<8} {:<10}", "Name", "Filename", "Parameters", "Speed", "Status");
            println!("{}", "-".repeat(62));
            for model in catalog.list() {
                println!(
                    "{:<8} {:<20} {:<12} {:<8} {:<10}",
                    model.size.name(),
                    model.filename,
                    model.size.parameters(),
                    model.size.relative_speed(),
                    if model.downloaded { "Downloaded" } else { "Missing" }
                );
            }
        }
        Commands::Extract { input, output } => {
            info!("Extracting audio from: {}", input.display());
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            media.extract_audio(&input, &output).await?;
            println!("Audio written to {}", output.display());
        }
        Commands::Burn { video, subtitles, output, style } => {
            info!("Burning {} into {}", subtitles.display(), video.display());
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            media.check_availability().await?;

            let style = style.resolve(&config)?;
            let cancel = cancel_on_ctrl_c();
            let bar = spinner();
            bar.set_message("Burning subtitles into video...");
            let guard = ArtifactGuard::new(output.clone());
            let result = media.burn_subtitles(&video, &subtitles, &output, &style, &cancel).await;
            bar.finish_and_clear();

            match result {
                Ok(()) => {
                    guard.keep();
                    println!("Video written to {}", output.display());
                }
                Err(SubgenError::Cancelled) => println!("Cancelled"),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Config { action: ConfigAction::Init { path, force } } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

/// Run the pipeline for one video with a terminal progress bar.
async fn generate(
    workflow: &Workflow,
    input: &Path,
    run: &RunArgs,
    config: &Config,
    cancel: &CancellationToken,
) -> subgen::error::Result<RunOutcome> {
    let request = run.to_request(input, config)?;
    if request.emit_burned_video() {
        workflow.media().check_availability().await?;
    }

    let bar = progress_bar();
    let sink = BarProgress(bar.clone());
    let outcome = workflow.run(&request, &sink, cancel).await;
    bar.finish_and_clear();

    match &outcome {
        Ok(RunOutcome::Completed(report)) => {
            println!("Done! Detected language: {}", report.detected_language);
            for path in report.subtitle_path.iter().chain(report.video_path.iter()) {
                println!("  {}", path.display());
            }
        }
        Ok(RunOutcome::Cancelled) => println!("Cancelled"),
        Err(_) => {}
    }
    outcome
}

/// Forwards pipeline progress to an indicatif bar
struct BarProgress(ProgressBar);

impl ProgressSink for BarProgress {
    fn report(&self, percent: f64, status: Option<&str>) {
        self.0.set_position(percent.round() as u64);
        if let Some(status) = status {
            self.0.set_message(status.to_string());
        }
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

fn spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.enable_steady_tick(std::time::Duration::from_millis(120));
    bar
}

/// Token fired by the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling...");
            child.cancel();
        }
    });
    token
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir: PathBuf = std::env::current_dir()?.join(".subgen").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "subgen.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("subgen.log").display());

    Ok(())
}
