//! Speak command implementation.

use crate::checkpoint::load_envelope;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::PodgenError;
use crate::script::ScriptLine;
use crate::tts::{TtsEngine, TtsProvider};
use anyhow::Result;
use std::path::Path;

/// Read script lines from a final-script checkpoint or a bare JSON array.
fn load_script(path: &Path) -> crate::Result<Vec<ScriptLine>> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    if value.is_array() {
        return Ok(serde_json::from_value(value)?);
    }
    if value.is_object() {
        return Ok(load_envelope::<Vec<ScriptLine>>(path)?.payload);
    }
    Err(PodgenError::InvalidInput(format!(
        "{} is neither a script checkpoint nor a list of script lines",
        path.display()
    )))
}

/// Run the speak command.
pub async fn run_speak(script: &Path, output: &Path, settings: Settings) -> Result<()> {
    let provider: TtsProvider = settings.tts.provider.parse()?;

    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Speak(provider)) {
        Output::error(&format!("{}", e));
        Output::info("Run 'podgen doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let lines = match load_script(script) {
        Ok(lines) => lines,
        Err(e) => {
            Output::error(&format!("Failed to read script: {}", e));
            return Err(e.into());
        }
    };
    Output::info(&format!(
        "Synthesizing {} lines with {}",
        lines.len(),
        provider
    ));

    let engine = TtsEngine::from_settings(&settings.tts, settings.temp_dir())?;
    let report = engine.convert_to_speech(&lines, output).await?;

    Output::success(&format!(
        "Audio saved to {} ({} segments, {} requests)",
        report.output.display(),
        report.segments,
        report.calls
    ));
    Ok(())
}
