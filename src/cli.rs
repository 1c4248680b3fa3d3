use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::generate::ModelChoice;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate an explainer video, narration and sign-language video from a prompt
    Generate {
        /// What the animation should explain
        #[arg(short, long)]
        prompt: String,

        /// Text-generation model
        #[arg(short, long, value_enum, default_value = "gpt-3.5-turbo")]
        model: ModelChoice,

        /// Your own API key; lifts the prompt length cap
        #[arg(long)]
        api_key: Option<String>,

        /// Print the generated construct body
        #[arg(long)]
        show_code: bool,

        /// Also write the rendered video with the narration as its soundtrack
        #[arg(long)]
        merge_audio: bool,

        /// Directory for the scene source and all outputs
        #[arg(short, long)]
        work_dir: Option<PathBuf>,
    },

    /// Check that manim, ffmpeg and ffprobe can be executed
    Check,

    /// Write a configuration file with default values
    InitConfig {
        /// Output path
        #[arg(default_value = "explainer.toml")]
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_defaults_to_standard_model() {
        let args = Args::try_parse_from(["explainer", "generate", "--prompt", "Pythagoras Theorem"]).unwrap();
        match args.command {
            Commands::Generate { prompt, model, api_key, show_code, merge_audio, work_dir } => {
                assert_eq!(prompt, "Pythagoras Theorem");
                assert_eq!(model, ModelChoice::Gpt35Turbo);
                assert!(api_key.is_none());
                assert!(!show_code && !merge_audio);
                assert!(work_dir.is_none());
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn premium_model_and_flags_parse() {
        let args = Args::try_parse_from([
            "explainer", "-v", "generate", "-p", "Explain gravity", "-m", "gpt-4",
            "--api-key", "sk-own", "--show-code", "--merge-audio",
        ])
        .unwrap();
        assert!(args.verbose);
        match args.command {
            Commands::Generate { model, api_key, show_code, merge_audio, .. } => {
                assert_eq!(model, ModelChoice::Gpt4);
                assert_eq!(api_key.as_deref(), Some("sk-own"));
                assert!(show_code && merge_audio);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert!(Args::try_parse_from(["explainer", "generate", "-p", "x", "-m", "davinci"]).is_err());
    }
}
