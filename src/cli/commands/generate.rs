//! Generate command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{Mode, Output};
use crate::config::Settings;
use crate::orchestrator::{GenerationMode, GenerationRequest, Orchestrator};
use crate::tts::TtsProvider;
use anyhow::Result;
use std::path::PathBuf;

/// Arguments of the generate command.
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    pub topic: String,
    pub mode: Mode,
    pub sources: Vec<String>,
    pub qa_rounds: u32,
    pub no_checkpoint: bool,
    pub audio_output: Option<PathBuf>,
    pub text_output: Option<PathBuf>,
}

impl GenerateArgs {
    /// Turn the arguments into a pipeline request.
    ///
    /// Without any output flag the script is written to
    /// `<output_dir>/<run key>.md`.
    fn into_request(self, settings: &Settings) -> Result<GenerationRequest> {
        let mode = match self.mode {
            Mode::Research => {
                if !self.sources.is_empty() {
                    Output::warning("--sources is ignored in research mode");
                }
                GenerationMode::Research
            }
            Mode::Context => {
                if self.sources.is_empty() {
                    return Err(anyhow::anyhow!("context mode requires --sources"));
                }
                GenerationMode::Context {
                    sources: self.sources,
                }
            }
        };

        let text_output = match (&self.text_output, &self.audio_output) {
            (None, None) => Some(settings.output_dir().join(format!(
                "{}.md",
                crate::checkpoint::run_key(&self.topic, self.qa_rounds)
            ))),
            (text, _) => text.clone(),
        };

        let mut request = GenerationRequest::new(self.topic, mode);
        request.qa_rounds = self.qa_rounds;
        request.checkpoint = !self.no_checkpoint;
        request.text_output = text_output;
        request.audio_output = self.audio_output;
        Ok(request)
    }
}

/// Run the generate command.
pub async fn run_generate(args: GenerateArgs, settings: Settings) -> Result<()> {
    let audio = match &args.audio_output {
        Some(_) => Some(settings.tts.provider.parse::<TtsProvider>()?),
        None => None,
    };

    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Generate {
        research: args.mode == Mode::Research,
        audio,
    }) {
        Output::error(&format!("{}", e));
        Output::info("Run 'podgen doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let request = match args.into_request(&settings) {
        Ok(request) => request,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e);
        }
    };

    Output::info(&format!("Generating podcast: {}", request.topic));
    if !request.checkpoint || !settings.checkpoint.enabled {
        Output::info("Checkpointing disabled, every stage runs from scratch");
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Writing episode...");
    let result = orchestrator.generate(&request).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            Output::success(&format!("Generated {} script lines", report.line_count));
            Output::kv("Run key", &report.run_key);
            if let Some(path) = &report.text_output {
                Output::kv("Script", &path.display().to_string());
            }
            if let Some(audio) = &report.audio_output {
                Output::kv(
                    "Audio",
                    &format!("{} ({} segments)", audio.output.display(), audio.segments),
                );
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Generation failed: {}", e));
            if request.checkpoint {
                Output::info("Completed stages were checkpointed; re-run the same command to resume.");
            }
            Err(e.into())
        }
    }
}
