//! podgen CLI entry point.

use anyhow::Result;
use clap::Parser;
use podgen::cli::commands::{self, GenerateArgs};
use podgen::cli::{Cli, Commands};
use podgen::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("podgen={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
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
            let args = GenerateArgs {
                topic,
                mode,
                sources,
                qa_rounds,
                no_checkpoint,
                audio_output,
                text_output,
            };
            commands::run_generate(args, settings).await?;
        }

        Commands::Speak { script, output } => {
            commands::run_speak(&script, &output, settings).await?;
        }

        Commands::Checkpoints { action } => {
            commands::run_checkpoints(&action, &settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, config_path.as_deref())?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, config_path)?;
        }
    }

    Ok(())
}
