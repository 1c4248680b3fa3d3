//! Explainer - prompt to animated explainer video
//!
//! Entry point: turns a short prompt into a rendered manim animation, a spoken
//! narration and a fingerspelled sign-language video.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use explainer::artifacts::ArtifactPaths;
use explainer::cli::{Args, Commands};
use explainer::config::Config;
use explainer::media::MediaProcessorFactory;
use explainer::render::{ManimRenderer, SceneRenderer};
use explainer::sign_language::StaticImageSet;
use explainer::speech::{write_key_file, SpeechOutcome};
use explainer::workflow::{GenerationRequest, Workflow};

const DEFAULT_CONFIG_FILE: &str = "explainer.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;
    info!("Starting Explainer");

    if let Commands::InitConfig { path } = &args.command {
        Config::default().save_to_file(path)?;
        println!("Default configuration written to {}", path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env_overrides();

    if let Some(credentials) = &config.speech.credentials {
        write_key_file(credentials, &config.speech.key_file)?;
    }

    match args.command {
        Commands::Check => {
            ManimRenderer::new(config.render.clone()).check_availability().await?;
            MediaProcessorFactory::create_processor(&config.media).check_availability().await?;
            println!("manim, ffmpeg and ffprobe are available");
        }
        Commands::Generate { prompt, model, api_key, show_code, merge_audio, work_dir } => {
            let work_dir = work_dir.unwrap_or_else(|| config.artifacts.work_dir.clone());
            std::fs::create_dir_all(&work_dir)?;
            let paths = ArtifactPaths::new(&work_dir, config.render.scene_name.clone());

            let images = Arc::new(StaticImageSet::load(&config.sign_language.images_dir)?);
            let workflow = Workflow::new(config, images)?;

            let request = GenerationRequest { prompt, model, api_key, show_code, merge_audio };
            let output = match workflow.run(&request, &paths).await {
                Ok(output) => output,
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    eprintln!("{}", e.user_message());
                    return Err(e.into());
                }
            };

            if let Some(code) = &output.code {
                println!("\n--- Generated code ---{}\n", code);
            }
            println!("Video: {} ({:.2}s)", output.video.path.display(), output.video.duration);
            println!("\nNarration:\n{}\n", output.narration);
            match &output.speech {
                SpeechOutcome::Synthesized(path) => println!("Narration audio: {}", path.display()),
                SpeechOutcome::Unavailable { reason } => println!("Narration audio unavailable: {}", reason),
            }
            match &output.sign_language.path {
                Some(path) => println!("Sign-language video: {} ({} frames)", path.display(), output.sign_language.frames.len()),
                None => println!("Sign-language video skipped: narration has no spellable characters"),
            }
            if let Some(merged) = &output.merged_video {
                println!("Video with narration: {}", merged.display());
            }
        }
        Commands::InitConfig { .. } => {}
    }

    info!("Explainer completed successfully");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".explainer").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "explainer.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

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
          log_level, log_dir.join("explainer.log").display());

    Ok(())
}
