//! Configuration settings for podgen.

use crate::error::{PodgenError, Result};
use crate::script::Speaker;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub checkpoint: CheckpointSettings,
    pub llm: LlmSettings,
    pub tts: TtsSettings,
    pub research: ResearchSettings,
    pub podcast: PodcastSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for final output files.
    pub output_dir: String,
    /// Directory for temporary audio segments.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "./output".to_string(),
            temp_dir: "./.temp_audio".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Stage checkpointing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointSettings {
    /// Persist stage results so interrupted runs can resume.
    pub enabled: bool,
    /// Directory holding checkpoint files.
    pub dir: String,
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "./.checkpoints".to_string(),
        }
    }
}

/// Pacing and retry figures for one external service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Maximum calls per minute (0 = unlimited).
    pub requests_per_minute: u32,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Initial backoff in seconds, doubled after every failure.
    pub base_delay_seconds: f64,
}

impl RateLimitSettings {
    /// Initial backoff as a `Duration`; non-finite or negative values clamp.
    pub fn base_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.base_delay_seconds).unwrap_or(
            if self.base_delay_seconds > 0.0 {
                Duration::MAX
            } else {
                Duration::ZERO
            },
        )
    }

    fn validate(&self, section: &str) -> Result<()> {
        let delay = self.base_delay_seconds;
        if !delay.is_finite() || delay < 0.0 {
            return Err(PodgenError::Config(format!(
                "{}.base_delay_seconds must be a finite, non-negative number (got {})",
                section, delay
            )));
        }
        Ok(())
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_minute: 20,
            max_retries: 10,
            base_delay_seconds: 2.0,
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Long-context model used for outlining and writing.
    pub model: String,
    /// Cheaper model used for research suggestions.
    pub fast_model: String,
    /// Embedding model for retrieval during drafting.
    pub embedding_model: String,
    /// Sampling temperature for chat completions.
    pub temperature: f32,
    /// Pacing and retries for LLM calls.
    pub rate_limit: RateLimitSettings,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            fast_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: 1.0,
            rate_limit: RateLimitSettings {
                requests_per_minute: 12,
                max_retries: 10,
                base_delay_seconds: 2.0,
            },
        }
    }
}

/// Voice selection for one provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceSettings {
    /// Voice name (or speaker tag) per role.
    pub voice_mapping: VoiceMapping,
    /// Language code, where the provider needs one.
    pub language_code: String,
    /// Audio effects profile (Google only).
    pub effects_profile_id: Option<String>,
    /// Synthesis model, where the provider needs one.
    pub model: Option<String>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self::google()
    }
}

/// Voice per speaker role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VoiceMapping {
    #[serde(rename = "Interviewer")]
    pub interviewer: String,
    #[serde(rename = "Interviewee")]
    pub interviewee: String,
}

impl VoiceSettings {
    fn mapping(interviewer: &str, interviewee: &str) -> VoiceMapping {
        VoiceMapping {
            interviewer: interviewer.to_string(),
            interviewee: interviewee.to_string(),
        }
    }

    pub fn google() -> Self {
        Self {
            voice_mapping: Self::mapping("en-US-Journey-F", "en-US-Journey-D"),
            language_code: "en-US".to_string(),
            effects_profile_id: Some("small-bluetooth-speaker-class-device".to_string()),
            model: None,
        }
    }

    pub fn google_multispeaker() -> Self {
        Self {
            voice_mapping: Self::mapping("R", "S"),
            language_code: "en-US".to_string(),
            effects_profile_id: Some("small-bluetooth-speaker-class-device".to_string()),
            model: Some("en-US-Studio-MultiSpeaker".to_string()),
        }
    }

    pub fn elevenlabs() -> Self {
        Self {
            voice_mapping: Self::mapping("Chris", "Charlie"),
            language_code: "en".to_string(),
            effects_profile_id: None,
            model: Some("eleven_multilingual_v2".to_string()),
        }
    }

    pub fn openai() -> Self {
        Self {
            voice_mapping: Self::mapping("nova", "onyx"),
            language_code: "en".to_string(),
            effects_profile_id: None,
            model: Some("tts-1".to_string()),
        }
    }

    /// Voice configured for `speaker`.
    pub fn voice_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Interviewer => &self.voice_mapping.interviewer,
            Speaker::Interviewee => &self.voice_mapping.interviewee,
        }
    }
}

/// Per-provider rate limits.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TtsRateLimits {
    pub google: RateLimitSettings,
    pub elevenlabs: RateLimitSettings,
    pub openai: RateLimitSettings,
    pub google_multispeaker: RateLimitSettings,
}

/// Text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    /// Provider name (google, elevenlabs, openai, google_multispeaker).
    pub provider: String,
    /// Container format of the merged output (mp3, wav, ogg, flac, m4a).
    pub output_format: String,
    /// Lines per call in multi-speaker mode.
    pub multispeaker_batch_size: usize,
    pub google: VoiceSettings,
    pub elevenlabs: VoiceSettings,
    pub openai: VoiceSettings,
    pub google_multispeaker: VoiceSettings,
    pub rate_limits: TtsRateLimits,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            output_format: "mp3".to_string(),
            multispeaker_batch_size: 4,
            google: VoiceSettings::google(),
            elevenlabs: VoiceSettings::elevenlabs(),
            openai: VoiceSettings::openai(),
            google_multispeaker: VoiceSettings::google_multispeaker(),
            rate_limits: TtsRateLimits::default(),
        }
    }
}

/// Research settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchSettings {
    /// Wikipedia language edition.
    pub wikipedia_language: String,
    /// Maximum search results per query.
    pub max_results_per_query: u32,
    /// Domains excluded from web search.
    pub exclude_domains: Vec<String>,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            wikipedia_language: "en".to_string(),
            max_results_per_query: 5,
            exclude_domains: vec![
                "wikipedia.org".to_string(),
                "youtube.com".to_string(),
                "books.google.com".to_string(),
                "academia.edu".to_string(),
                "washingtonpost.com".to_string(),
            ],
        }
    }
}

/// Show identity and episode shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PodcastSettings {
    pub name: String,
    /// Intro line; `{podcast_name}` and `{topic}` are substituted.
    pub intro: String,
    /// Outro line; `{podcast_name}` and `{topic}` are substituted.
    pub outro: String,
    /// Top-level sections the outline should follow.
    pub episode_structure: Vec<String>,
}

impl Default for PodcastSettings {
    fn default() -> Self {
        Self {
            name: "Podcast LLM".to_string(),
            intro: "Welcome to {podcast_name}. Today we've invited an expert to talk about {topic}."
                .to_string(),
            outro: "That's all for today. Thank you for listening to {podcast_name}. See you next time when we'll talk about whatever you want."
                .to_string(),
            episode_structure: vec![
                "Episode Introduction (with subsections)".to_string(),
                "Main Discussion Topics (with subsections)".to_string(),
                "Conclusion (with subsections)".to_string(),
            ],
        }
    }
}

impl PodcastSettings {
    /// Episode structure as a bulleted list for prompts.
    pub fn episode_structure_for_prompt(&self) -> String {
        self.episode_structure
            .iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn fill(&self, template: &str, topic: &str) -> String {
        template
            .replace("{podcast_name}", &self.name)
            .replace("{topic}", topic)
    }

    pub fn intro_for(&self, topic: &str) -> String {
        self.fill(&self.intro, topic)
    }

    pub fn outro_for(&self, topic: &str) -> String {
        self.fill(&self.outro, topic)
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Settings {
    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values that would break pacing or backoff.
    pub fn validate(&self) -> Result<()> {
        self.llm.rate_limit.validate("llm.rate_limit")?;
        let tts = &self.tts.rate_limits;
        tts.google.validate("tts.rate_limits.google")?;
        tts.elevenlabs.validate("tts.rate_limits.elevenlabs")?;
        tts.openai.validate("tts.rate_limits.openai")?;
        tts.google_multispeaker.validate("tts.rate_limits.google_multispeaker")?;
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PodgenError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("podgen")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        Self::expand_path(&self.checkpoint.dir)
    }
}
