//! Error types for podgen.

use std::path::PathBuf;
use thiserror::Error;

/// Library-level error type for podgen operations.
#[derive(Error, Debug)]
pub enum PodgenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("LLM response error: {0}")]
    Llm(String),

    #[error("Research failed: {0}")]
    Research(String),

    #[error("Content extraction failed: {0}")]
    Extraction(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Audio merge failed: {0}")]
    AudioMerge(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Unsupported TTS provider: {0} (expected google, elevenlabs, openai or google_multispeaker)")]
    UnsupportedProvider(String),

    #[error("Missing API key: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("Checkpoint {} is corrupt ({reason}). Delete it to re-run the stage.", path.display())]
    CheckpointCorrupt { path: PathBuf, reason: String },

    #[error("Checkpoint {} has an incompatible format ({reason}). Delete it to re-run the stage.", path.display())]
    CheckpointFormat { path: PathBuf, reason: String },
}

/// Result type alias for podgen operations.
pub type Result<T> = std::result::Result<T, PodgenError>;
