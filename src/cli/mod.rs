//! CLI module for podgen.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// podgen - AI podcast generator
///
/// Researches a topic, writes a two-voice interview script and renders it to
/// audio with a text-to-speech provider.
#[derive(Parser, Debug)]
#[command(name = "podgen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "PODGEN_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where background material comes from.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Research the topic on Wikipedia and the web
    Research,
    /// Build the episode from the files and URLs given with --sources
    Context,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a podcast episode about a topic
    Generate {
        /// Topic of the episode
        topic: String,

        /// Source of background material
        #[arg(short, long, value_enum, default_value = "research")]
        mode: Mode,

        /// Files or URLs to use in context mode
        #[arg(short, long, num_args = 1..)]
        sources: Vec<String>,

        /// Question/answer exchanges per outline subsection
        #[arg(short, long, default_value = "2")]
        qa_rounds: u32,

        /// Run every stage from scratch without reading or writing checkpoints
        #[arg(long)]
        no_checkpoint: bool,

        /// Write the episode audio to this file
        #[arg(short, long)]
        audio_output: Option<PathBuf>,

        /// Write the Markdown script to this file
        #[arg(short, long)]
        text_output: Option<PathBuf>,
    },

    /// Synthesize a saved script to audio
    Speak {
        /// Final-script checkpoint, or a JSON array of script lines
        script: PathBuf,

        /// Audio output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Inspect or remove stage checkpoints
    Checkpoints {
        #[command(subcommand)]
        action: CheckpointAction,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CheckpointAction {
    /// List checkpoints saved for a topic
    List {
        topic: String,

        #[arg(short, long, default_value = "2")]
        qa_rounds: u32,
    },

    /// Delete checkpoints saved for a topic
    Clear {
        topic: String,

        #[arg(short, long, default_value = "2")]
        qa_rounds: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate_context() {
        let cli = Cli::try_parse_from([
            "podgen",
            "-vv",
            "generate",
            "Ocean tides",
            "--mode",
            "context",
            "--sources",
            "notes.md",
            "https://example.com/tides",
            "--qa-rounds",
            "3",
            "--no-checkpoint",
            "--text-output",
            "out/tides.md",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Generate {
                topic,
                mode,
                sources,
                qa_rounds,
                no_checkpoint,
                audio_output,
                text_output,
            } => {
                assert_eq!(topic, "Ocean tides");
                assert_eq!(mode, Mode::Context);
                assert_eq!(sources, vec!["notes.md", "https://example.com/tides"]);
                assert_eq!(qa_rounds, 3);
                assert!(no_checkpoint);
                assert!(audio_output.is_none());
                assert_eq!(text_output, Some(PathBuf::from("out/tides.md")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["podgen", "generate", "Tides"]).unwrap();
        match cli.command {
            Commands::Generate {
                mode,
                sources,
                qa_rounds,
                no_checkpoint,
                ..
            } => {
                assert_eq!(mode, Mode::Research);
                assert!(sources.is_empty());
                assert_eq!(qa_rounds, 2);
                assert!(!no_checkpoint);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let result = Cli::try_parse_from(["podgen", "generate", "Tides", "--mode", "dream"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_checkpoint_clear() {
        let cli = Cli::try_parse_from(["podgen", "checkpoints", "clear", "Tides", "-q", "4"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Checkpoints {
                action: CheckpointAction::Clear { ref topic, qa_rounds: 4 }
            } if topic == "Tides"
        ));
    }
}
