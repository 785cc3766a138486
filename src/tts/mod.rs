//! Speech synthesis and episode assembly.
//!
//! The [`TtsEngine`] turns a final script into one audio file:
//!
//! 1. Clean every line ([`clean_text_for_tts`]).
//! 2. Group lines into requests: one line each for single-voice providers, or
//!    batches of consecutive lines (speaker runs pre-merged) for multi-speaker.
//! 3. Synthesize each request through the provider's retry and rate-limit
//!    wrapper and write it as a numbered segment.
//! 4. Merge the segments in order, then delete them.
//!
//! Segments are removed on every exit path. If the merge fails, any partial
//! output is removed too, so a run yields the full episode or nothing.

mod clean;
mod elevenlabs;
mod google;
pub mod merge;
mod openai;

pub use clean::{clean_text_for_tts, combine_consecutive_speaker_lines};
pub use elevenlabs::ElevenLabsTts;
pub use google::{GoogleMultiSpeakerTts, GoogleTts};
pub use merge::{merge_segments, AudioMerger, FfmpegMerger, OutputFormat};
pub use openai::OpenAITts;

use crate::config::{RateLimitSettings, TtsSettings, VoiceSettings};
use crate::error::{PodgenError, Result};
use crate::openai::default_http_client;
use crate::resilience::{Clock, Resilient, SystemClock};
use crate::script::ScriptLine;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Supported synthesis providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProvider {
    Google,
    ElevenLabs,
    OpenAI,
    GoogleMultiSpeaker,
}

impl TtsProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            TtsProvider::Google => "google",
            TtsProvider::ElevenLabs => "elevenlabs",
            TtsProvider::OpenAI => "openai",
            TtsProvider::GoogleMultiSpeaker => "google_multispeaker",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            TtsProvider::Google | TtsProvider::GoogleMultiSpeaker => "GOOGLE_API_KEY",
            TtsProvider::ElevenLabs => "ELEVENLABS_API_KEY",
            TtsProvider::OpenAI => "OPENAI_API_KEY",
        }
    }

    pub fn voices<'a>(&self, settings: &'a TtsSettings) -> &'a VoiceSettings {
        match self {
            TtsProvider::Google => &settings.google,
            TtsProvider::ElevenLabs => &settings.elevenlabs,
            TtsProvider::OpenAI => &settings.openai,
            TtsProvider::GoogleMultiSpeaker => &settings.google_multispeaker,
        }
    }

    pub fn rate_limits<'a>(&self, settings: &'a TtsSettings) -> &'a RateLimitSettings {
        match self {
            TtsProvider::Google => &settings.rate_limits.google,
            TtsProvider::ElevenLabs => &settings.rate_limits.elevenlabs,
            TtsProvider::OpenAI => &settings.rate_limits.openai,
            TtsProvider::GoogleMultiSpeaker => &settings.rate_limits.google_multispeaker,
        }
    }
}

impl FromStr for TtsProvider {
    type Err = PodgenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(TtsProvider::Google),
            "elevenlabs" => Ok(TtsProvider::ElevenLabs),
            "openai" => Ok(TtsProvider::OpenAI),
            "google_multispeaker" => Ok(TtsProvider::GoogleMultiSpeaker),
            _ => Err(PodgenError::UnsupportedProvider(s.to_string())),
        }
    }
}

impl std::fmt::Display for TtsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A remote speech synthesis backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Provider name, for logging.
    fn name(&self) -> &str;

    /// Lines sent per request. Single-voice providers take one.
    fn batch_size(&self) -> usize {
        1
    }

    /// File extension of the returned audio.
    fn extension(&self) -> &str {
        "mp3"
    }

    /// Synthesize `lines` in order and return the encoded audio.
    async fn synthesize(&self, lines: &[ScriptLine]) -> Result<Vec<u8>>;
}

/// Build the synthesizer for `provider`.
pub fn create_synthesizer(
    provider: TtsProvider,
    settings: &TtsSettings,
    http: reqwest::Client,
) -> Box<dyn SpeechSynthesizer> {
    let voices = provider.voices(settings).clone();
    match provider {
        TtsProvider::Google => Box::new(GoogleTts::new(http, voices)),
        TtsProvider::ElevenLabs => Box::new(ElevenLabsTts::new(http, voices)),
        TtsProvider::OpenAI => Box::new(OpenAITts::new(http, voices)),
        TtsProvider::GoogleMultiSpeaker => Box::new(GoogleMultiSpeakerTts::new(
            http,
            voices,
            settings.multispeaker_batch_size,
        )),
    }
}

/// Segment files owned by one synthesis run, deleted on drop.
#[derive(Debug, Default)]
pub struct SegmentSet {
    paths: Vec<PathBuf>,
}

impl SegmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `path`; it is deleted when the set drops.
    pub fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Drop for SegmentSet {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => debug!("Removed segment {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove segment {}: {}", path.display(), e),
            }
        }
    }
}

/// Outcome of a synthesis run.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisReport {
    /// Segments written and merged.
    pub segments: usize,
    /// Successful provider requests.
    pub calls: usize,
    /// Merged audio file.
    pub output: PathBuf,
}

/// Group cleaned lines into provider requests.
fn plan_requests(lines: &[ScriptLine], batch_size: usize) -> Vec<Vec<ScriptLine>> {
    if batch_size <= 1 {
        return lines.iter().map(|line| vec![line.clone()]).collect();
    }
    lines
        .chunks(batch_size)
        .map(combine_consecutive_speaker_lines)
        .collect()
}

/// Script-to-audio engine.
pub struct TtsEngine {
    synthesizer: Box<dyn SpeechSynthesizer>,
    merger: Box<dyn AudioMerger>,
    calls: Resilient,
    temp_dir: PathBuf,
}

impl TtsEngine {
    /// Resolve the configured provider and output format.
    pub fn from_settings(settings: &TtsSettings, temp_dir: PathBuf) -> Result<Self> {
        let provider: TtsProvider = settings.provider.parse()?;
        let format: OutputFormat = settings.output_format.parse()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        info!("Using {} TTS provider, {} output", provider, format);

        Ok(Self::with_components(
            create_synthesizer(provider, settings, default_http_client()?),
            Box::new(FfmpegMerger::new(format)),
            Resilient::from_settings(provider.rate_limits(settings), clock),
            temp_dir,
        ))
    }

    /// Create with explicit components (for testing).
    pub fn with_components(
        synthesizer: Box<dyn SpeechSynthesizer>,
        merger: Box<dyn AudioMerger>,
        calls: Resilient,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            synthesizer,
            merger,
            calls,
            temp_dir,
        }
    }

    /// Synthesize `script` and write the merged episode to `output`.
    #[instrument(skip(self, script), fields(provider = self.synthesizer.name(), lines = script.len()))]
    pub async fn convert_to_speech(&self, script: &[ScriptLine], output: &Path) -> Result<SynthesisReport> {
        if script.is_empty() {
            return Err(PodgenError::InvalidInput("Script has no lines to synthesize".to_string()));
        }

        let cleaned = clean_text_for_tts(script);
        let requests = plan_requests(&cleaned, self.synthesizer.batch_size());
        info!(
            "Synthesizing {} lines in {} requests",
            cleaned.len(),
            requests.len()
        );

        std::fs::create_dir_all(&self.temp_dir)?;

        let mut segments = SegmentSet::new();
        let pb = ProgressBar::new(requests.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Synthesizing [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        for (index, request) in requests.iter().enumerate() {
            let label = format!("{} segment {}", self.synthesizer.name(), index);
            let audio = match self
                .calls
                .call(&label, || self.synthesizer.synthesize(request))
                .await
            {
                Ok(audio) => audio,
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(e);
                }
            };

            let path = self
                .temp_dir
                .join(format!("{:03}.{}", index, self.synthesizer.extension()));
            segments.push(path.clone());
            tokio::fs::write(&path, audio).await?;
            debug!("Wrote segment {}", path.display());
            pb.inc(1);
        }
        pb.finish_and_clear();

        let output_existed = output.exists();
        if let Err(e) = self.merger.merge(segments.paths(), output).await {
            // Only remove what this run wrote
            if !output_existed && output.exists() {
                if let Err(remove_err) = std::fs::remove_file(output) {
                    warn!("Failed to remove partial output {}: {}", output.display(), remove_err);
                }
            }
            return Err(e);
        }

        info!("Audio saved to {}", output.display());
        Ok(SynthesisReport {
            segments: segments.len(),
            calls: requests.len(),
            output: output.to_path_buf(),
        })
    }
}
