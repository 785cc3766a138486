//! Content generation stages.
//!
//! The orchestrator drives generation through the [`Stages`] trait, one
//! method per checkpointed stage. [`LlmStages`] is the production
//! implementation backed by an LLM, an embedder, Wikipedia and web search.

mod outline;
pub mod research;
pub mod retrieval;
mod stages;
mod writer;

pub use research::{collect_urls, Encyclopedia, TavilySearch, WebSearch, Wikipedia};
pub use retrieval::{split_text, RetrievalIndex};
pub use stages::{LlmStages, StageServices};

use crate::error::Result;
use crate::script::{ContextDocument, DialogueTurn, PodcastOutline, ScriptLine};
use async_trait::async_trait;

/// The work behind each pipeline stage.
#[async_trait]
pub trait Stages: Send + Sync {
    /// Gather background documents on `topic` (research mode).
    async fn background_research(&self, topic: &str) -> Result<Vec<ContextDocument>>;

    /// Extract user-supplied sources (context mode).
    async fn extract_sources(&self, sources: &[String]) -> Result<Vec<ContextDocument>>;

    /// Build the episode outline.
    async fn outline(&self, topic: &str, background: &[ContextDocument]) -> Result<PodcastOutline>;

    /// Gather documents targeted at the outline (research mode).
    async fn deep_research(&self, topic: &str, outline: &PodcastOutline) -> Result<Vec<ContextDocument>>;

    /// Simulate the interview, `qa_rounds` exchanges per subsection.
    async fn draft_script(
        &self,
        topic: &str,
        outline: &PodcastOutline,
        background: &[ContextDocument],
        deep: &[ContextDocument],
        qa_rounds: u32,
    ) -> Result<Vec<DialogueTurn>>;

    /// Rewrite the draft into the final speaker-tagged script.
    async fn final_script(&self, topic: &str, draft: &[DialogueTurn]) -> Result<Vec<ScriptLine>>;
}
