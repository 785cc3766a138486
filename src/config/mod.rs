//! Configuration module for podgen.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{
    DialoguePrompts, OutlinePrompts, PromptPair, Prompts, ResearchPrompts, RewritePrompts,
};
pub use settings::{
    CheckpointSettings, GeneralSettings, LlmSettings, PodcastSettings, PromptSettings,
    RateLimitSettings, ResearchSettings, Settings, TtsRateLimits, TtsSettings, VoiceMapping,
    VoiceSettings,
};
