//! podgen - AI podcast generator
//!
//! Turns a topic into a two-voice interview episode: background research,
//! an outline, a question-by-question draft, a polished script and finally
//! synthesized audio.
//!
//! # Overview
//!
//! A run moves through fixed stages, each checkpointed to disk so an
//! interrupted run resumes where it stopped:
//!
//! 1. Background research (Wikipedia) or extraction of user-supplied sources
//! 2. Outline generation
//! 3. Deep research with web search (research mode only)
//! 4. Draft dialogue, grounded with retrieval over the research
//! 5. Final script rewrite with intro and outro
//! 6. Speech synthesis and merging into one audio file
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `checkpoint` - Stage result persistence keyed by topic and QA rounds
//! - `resilience` - Rate limiting and retry with backoff
//! - `llm` - Structured-output language model access
//! - `embedding` - Embedding generation for retrieval
//! - `sources` - Text extraction from files and web pages
//! - `pipeline` - The generation stages
//! - `tts` - Speech synthesis providers and audio merging
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use podgen::config::Settings;
//! use podgen::orchestrator::{GenerationMode, GenerationRequest, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load_from(None)?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let mut request = GenerationRequest::new("The history of tea", GenerationMode::Research);
//!     request.text_output = Some("tea.md".into());
//!     request.audio_output = Some("tea.mp3".into());
//!
//!     let report = orchestrator.generate(&request).await?;
//!     println!("Wrote {} lines", report.line_count);
//!
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod pipeline;
pub mod resilience;
pub mod script;
pub mod sources;
pub mod tts;

pub use error::{PodgenError, Result};
