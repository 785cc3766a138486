//! Outline generation.

use super::stages::{format_documents, vars, LlmStages};
use crate::error::{PodgenError, Result};
use crate::script::{ContextDocument, PodcastOutline};
use tracing::{info, instrument};

impl LlmStages {
    #[instrument(skip(self, background), fields(documents = background.len()))]
    pub(super) async fn generate_outline(
        &self,
        topic: &str,
        background: &[ContextDocument],
    ) -> Result<PodcastOutline> {
        info!("Generating outline for topic: {}", topic);

        let prompt = &self.prompts.outline;
        let outline: PodcastOutline = self
            .ask(
                "generate_outline",
                self.services.llm.as_ref(),
                &prompt.system,
                &prompt.user,
                &vars([
                    ("topic", topic.to_string()),
                    ("episode_structure", self.podcast.episode_structure_for_prompt()),
                    ("context_documents", format_documents(background)),
                ]),
            )
            .await?;

        if outline.sections.is_empty() {
            return Err(PodgenError::Llm("Outline has no sections".to_string()));
        }

        info!(
            "Outline has {} sections and {} subsections",
            outline.sections.len(),
            outline.subsection_count()
        );
        Ok(outline)
    }
}
