//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and API keys are available before starting
//! a run that would otherwise fail after paying for several LLM calls.

use crate::error::{PodgenError, Result};
use crate::openai::require_api_key;
use crate::tts::TtsProvider;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Script generation, optionally followed by synthesis.
    Generate {
        /// Research mode needs web search.
        research: bool,
        /// Provider used when audio output was requested.
        audio: Option<TtsProvider>,
    },
    /// Synthesis of an existing script.
    Speak(TtsProvider),
}

/// Something an operation needs from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    ApiKey(&'static str),
    Tool(&'static str),
}

/// List what `operation` needs, without duplicates.
pub fn requirements(operation: Operation) -> Vec<Requirement> {
    let mut needed = Vec::new();
    let mut add = |req: Requirement| {
        if !needed.contains(&req) {
            needed.push(req);
        }
    };

    let audio = match operation {
        Operation::Generate { research, audio } => {
            add(Requirement::ApiKey("OPENAI_API_KEY"));
            if research {
                add(Requirement::ApiKey("TAVILY_API_KEY"));
            }
            audio
        }
        Operation::Speak(provider) => Some(provider),
    };

    if let Some(provider) = audio {
        add(Requirement::ApiKey(provider.api_key_var()));
        add(Requirement::Tool("ffmpeg"));
    }

    needed
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or the first missing requirement.
pub fn check(operation: Operation) -> Result<()> {
    for requirement in requirements(operation) {
        match requirement {
            Requirement::ApiKey(var) => {
                require_api_key(var)?;
            }
            Requirement::Tool(name) => check_tool(name)?,
        }
    }
    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(PodgenError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PodgenError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(PodgenError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
