//! Draft interview and final script rewriting.

use super::retrieval::{RetrievalIndex, TOP_K};
use super::stages::{format_documents, vars, LlmStages};
use crate::error::Result;
use crate::script::{
    format_conversation_history, Answer, ContextDocument, DialogueTurn, PodcastOutline,
    PodcastSection, PodcastSubsection, Question, Script, ScriptLine, Speaker,
};
use tracing::{info, instrument};

/// Target answer length passed to the interviewee prompt.
const ANSWER_WORD_COUNT: u32 = 100;

impl LlmStages {
    #[instrument(skip_all, fields(topic = %topic, qa_rounds = qa_rounds))]
    pub(super) async fn write_draft_script(
        &self,
        topic: &str,
        outline: &PodcastOutline,
        background: &[ContextDocument],
        deep: &[ContextDocument],
        qa_rounds: u32,
    ) -> Result<Vec<DialogueTurn>> {
        let documents: Vec<ContextDocument> = background.iter().chain(deep).cloned().collect();
        let index = RetrievalIndex::build(self.services.embedder.clone(), &documents).await?;

        let background_info = format_documents(background);
        let mut discussion = Vec::new();

        for section in &outline.sections {
            for subsection in &section.subsections {
                info!(
                    "Discussing section '{}' subsection '{}'",
                    section.title, subsection.title
                );
                for _ in 0..qa_rounds {
                    let question = self
                        .ask_question(topic, outline, section, subsection, &background_info, &discussion)
                        .await?;
                    discussion.push(DialogueTurn::Question(question));

                    let answer = self
                        .answer_question(topic, outline, section, subsection, &index, &discussion)
                        .await?;
                    discussion.push(DialogueTurn::Answer(answer));
                }
            }
        }

        info!("Draft script has {} turns", discussion.len());
        Ok(discussion)
    }

    async fn ask_question(
        &self,
        topic: &str,
        outline: &PodcastOutline,
        section: &PodcastSection,
        subsection: &PodcastSubsection,
        background_info: &str,
        discussion: &[DialogueTurn],
    ) -> Result<Question> {
        let prompt = &self.prompts.dialogue.interviewer;
        self.ask(
            "ask_question",
            self.services.llm.as_ref(),
            &prompt.system,
            &prompt.user,
            &vars([
                ("topic", topic.to_string()),
                ("outline", outline.render()),
                ("section", section.title.clone()),
                ("subsection", subsection.title.clone()),
                ("background_info", background_info.to_string()),
                ("conversation_history", format_conversation_history(discussion)),
            ]),
        )
        .await
    }

    async fn answer_question(
        &self,
        topic: &str,
        outline: &PodcastOutline,
        section: &PodcastSection,
        subsection: &PodcastSubsection,
        index: &RetrievalIndex,
        discussion: &[DialogueTurn],
    ) -> Result<Answer> {
        let question = discussion.last().map(DialogueTurn::text).unwrap_or_default();
        let background_information = index.search(question, TOP_K).await?.join("\n\n");

        let prompt = &self.prompts.dialogue.interviewee;
        self.ask(
            "answer_question",
            self.services.llm.as_ref(),
            &prompt.system,
            &prompt.user,
            &vars([
                ("topic", topic.to_string()),
                ("outline", outline.render()),
                ("section", section.title.clone()),
                ("subsection", subsection.title.clone()),
                ("background_information", background_information),
                ("word_count", ANSWER_WORD_COUNT.to_string()),
                ("question", question.to_string()),
                ("conversation_history", format_conversation_history(discussion)),
            ]),
        )
        .await
    }

    #[instrument(skip_all, fields(topic = %topic, turns = draft.len()))]
    pub(super) async fn write_final_script(
        &self,
        topic: &str,
        draft: &[DialogueTurn],
    ) -> Result<Vec<ScriptLine>> {
        info!("Processing draft script in batches");

        let prompt = &self.prompts.rewrite;
        let batch_size = self.rewrite_batch_size.max(1);
        let mut lines = Vec::with_capacity(draft.len() + 2);

        lines.push(ScriptLine::new(Speaker::Interviewer, self.podcast.intro_for(topic)));

        for (i, batch) in draft.chunks(batch_size).enumerate() {
            let start = i * batch_size;
            info!(
                "Rewriting lines {} to {} of {}",
                start + 1,
                start + batch.len(),
                draft.len()
            );

            let rewritten: Script = self
                .ask(
                    "rewrite_script_section",
                    self.services.llm.as_ref(),
                    &prompt.system,
                    &prompt.user,
                    &vars([("script", format_conversation_history(batch))]),
                )
                .await?;
            lines.extend(rewritten.lines);
        }

        lines.push(ScriptLine::new(Speaker::Interviewer, self.podcast.outro_for(topic)));

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::super::stages::tests::{stages_with, ScriptedLlm};
    use crate::config::PodcastSettings;
    use crate::pipeline::Stages;
    use crate::script::{ContextDocument, DialogueTurn, Speaker};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_draft_alternates_per_subsection_and_round() {
        let llm = Arc::new(ScriptedLlm::new());
        let stages = stages_with(llm.clone(), 0);
        let outline = stages.outline("Tides", &[]).await.unwrap();
        let background = vec![ContextDocument::new("Tide", "The moon pulls the ocean.", "wiki/Tide")];
        let deep = vec![ContextDocument::new("Sun", "The sun also matters.", "web")];

        let draft = stages
            .draft_script("Tides", &outline, &background, &deep, 2)
            .await
            .unwrap();

        // 3 subsections x 2 rounds x (question + answer)
        assert_eq!(draft.len(), 12);
        for (i, turn) in draft.iter().enumerate() {
            let expected = if i % 2 == 0 { Speaker::Interviewer } else { Speaker::Interviewee };
            assert_eq!(turn.speaker(), expected);
        }

        let prompts = llm.user_prompts();
        // Second question sees the first exchange in its history
        assert!(prompts[3].contains(&format!("Interviewer: {}", draft[0].text())));
        assert!(prompts[3].contains(&format!("Interviewee: {}", draft[1].text())));
        // Answers get retrieved material and the question being answered
        assert!(prompts[2].contains("The moon pulls the ocean."));
        assert!(prompts[2].contains(draft[0].text()));
    }

    #[tokio::test]
    async fn test_final_script_rewrites_in_batches_with_intro_and_outro() {
        let llm = Arc::new(ScriptedLlm::new());
        let stages = stages_with(llm.clone(), 0);
        let draft: Vec<DialogueTurn> = (0..6)
            .map(|i| {
                if i % 2 == 0 {
                    DialogueTurn::question(format!("q{}", i))
                } else {
                    DialogueTurn::answer(format!("a{}", i))
                }
            })
            .collect();

        let script = stages.final_script("Tides", &draft).await.unwrap();

        assert_eq!(llm.calls.lock().unwrap().len(), 2);
        assert_eq!(script.len(), 8);
        let podcast = PodcastSettings::default();
        assert_eq!(script[0].speaker, Speaker::Interviewer);
        assert_eq!(script[0].text, podcast.intro_for("Tides"));
        assert_eq!(script[1].text, "Polished q0");
        assert_eq!(script[6].text, "Polished a5");
        assert_eq!(script[6].speaker, Speaker::Interviewee);
        assert_eq!(script[7].speaker, Speaker::Interviewer);
        assert_eq!(script[7].text, podcast.outro_for("Tides"));
    }
}
