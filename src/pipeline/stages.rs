//! LLM-backed stage implementations.

use super::research::{collect_urls, Encyclopedia, TavilySearch, WebSearch, Wikipedia};
use super::Stages;
use crate::config::{PodcastSettings, Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{PodgenError, Result};
use crate::llm::{generate, LanguageModel, OpenAIChat};
use crate::openai::default_http_client;
use crate::resilience::{Resilient, SystemClock};
use crate::script::{
    ContextDocument, DialogueTurn, PodcastOutline, ScriptLine, SearchQueries, WikipediaPages,
};
use crate::sources::{extract_content_from_sources, DocumentSource, WebPageSource};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Turns rewritten per LLM call in the final script stage.
pub const REWRITE_BATCH_SIZE: usize = 4;

/// External services used by [`LlmStages`].
pub struct StageServices {
    /// Long-context model for outlining and writing.
    pub llm: Arc<dyn LanguageModel>,
    /// Cheaper model for research suggestions.
    pub fast_llm: Arc<dyn LanguageModel>,
    pub embedder: Arc<dyn Embedder>,
    pub encyclopedia: Arc<dyn Encyclopedia>,
    pub search: Arc<dyn WebSearch>,
    /// Fetches the pages found by `search`.
    pub pages: Arc<dyn DocumentSource>,
}

/// Production [`Stages`] implementation.
pub struct LlmStages {
    pub(super) services: StageServices,
    pub(super) http: reqwest::Client,
    pub(super) prompts: Prompts,
    pub(super) podcast: PodcastSettings,
    /// Pacing and retries shared by every LLM call.
    pub(super) llm_calls: Resilient,
    pub(super) rewrite_batch_size: usize,
}

impl LlmStages {
    /// Build the OpenAI, Wikipedia and Tavily backed stages from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = default_http_client()?;
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let services = StageServices {
            llm: Arc::new(OpenAIChat::new(&settings.llm.model)?.with_temperature(settings.llm.temperature)),
            fast_llm: Arc::new(
                OpenAIChat::new(&settings.llm.fast_model)?.with_temperature(settings.llm.temperature),
            ),
            embedder: Arc::new(OpenAIEmbedder::new(
                &settings.llm.embedding_model,
                Resilient::from_settings(&settings.llm.rate_limit, Arc::new(SystemClock)),
            )?),
            encyclopedia: Arc::new(Wikipedia::new(http.clone(), &settings.research.wikipedia_language)),
            search: Arc::new(TavilySearch::new(
                http.clone(),
                settings.research.max_results_per_query,
                settings.research.exclude_domains.clone(),
            )),
            pages: Arc::new(WebPageSource::new(http.clone())),
        };

        let llm_calls = Resilient::from_settings(&settings.llm.rate_limit, Arc::new(SystemClock));

        Ok(Self::with_services(
            services,
            http,
            prompts,
            settings.podcast.clone(),
            llm_calls,
        ))
    }

    /// Build with explicit services (for testing).
    pub fn with_services(
        services: StageServices,
        http: reqwest::Client,
        prompts: Prompts,
        podcast: PodcastSettings,
        llm_calls: Resilient,
    ) -> Self {
        Self {
            services,
            http,
            prompts,
            podcast,
            llm_calls,
            rewrite_batch_size: REWRITE_BATCH_SIZE,
        }
    }

    /// Render `user` with `vars` and run it through `llm` with retry and pacing.
    pub(super) async fn ask<T: DeserializeOwned>(
        &self,
        label: &str,
        llm: &dyn LanguageModel,
        system: &str,
        user: &str,
        vars: &HashMap<String, String>,
    ) -> Result<T> {
        let system = self.prompts.render_with_custom(system, vars);
        let user = self.prompts.render_with_custom(user, vars);
        self.llm_calls
            .call(label, || generate::<T>(llm, &system, &user))
            .await
    }
}

/// Render documents for a prompt, separated by blank lines.
pub(super) fn format_documents(documents: &[ContextDocument]) -> String {
    documents
        .iter()
        .map(ContextDocument::format_for_prompt)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub(super) fn vars<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[async_trait]
impl Stages for LlmStages {
    #[instrument(skip(self))]
    async fn background_research(&self, topic: &str) -> Result<Vec<ContextDocument>> {
        info!("Suggesting Wikipedia articles for topic: {}", topic);

        let pair = &self.prompts.research.wikipedia;
        let suggestions: WikipediaPages = self
            .ask(
                "suggest_wikipedia_articles",
                self.services.fast_llm.as_ref(),
                &pair.system,
                &pair.user,
                &vars([("topic", topic.to_string())]),
            )
            .await?;

        info!("Found {} suggested Wikipedia articles", suggestions.pages.len());

        let mut documents = Vec::with_capacity(suggestions.pages.len());
        for page in &suggestions.pages {
            info!("Retrieving article: {}", page.name);
            match self.services.encyclopedia.article(&page.name).await {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!("Failed to retrieve article {}: {}", page.name, e),
            }
        }

        info!("Downloaded {} Wikipedia articles", documents.len());
        Ok(documents)
    }

    #[instrument(skip(self, sources), fields(count = sources.len()))]
    async fn extract_sources(&self, sources: &[String]) -> Result<Vec<ContextDocument>> {
        let documents = extract_content_from_sources(sources, &self.http).await;

        if documents.is_empty() {
            return Err(PodgenError::Extraction(
                "None of the supplied sources could be extracted".to_string(),
            ));
        }

        info!("Extracted {} of {} sources", documents.len(), sources.len());
        Ok(documents)
    }

    async fn outline(&self, topic: &str, background: &[ContextDocument]) -> Result<PodcastOutline> {
        self.generate_outline(topic, background).await
    }

    #[instrument(skip(self, outline))]
    async fn deep_research(&self, topic: &str, outline: &PodcastOutline) -> Result<Vec<ContextDocument>> {
        let pair = &self.prompts.research.search_queries;
        let queries: SearchQueries = self
            .ask(
                "suggest_search_queries",
                self.services.llm.as_ref(),
                &pair.system,
                &pair.user,
                &vars([("topic", topic.to_string()), ("outline", outline.render())]),
            )
            .await?;

        let mut results = Vec::with_capacity(queries.queries.len());
        for query in &queries.queries {
            info!("Searching for {}", query.query);
            results.push(self.services.search.search(&query.query).await?);
        }

        let urls = collect_urls(results);

        let mut documents = Vec::with_capacity(urls.len());
        for url in &urls {
            match self.services.pages.extract(url).await {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!("Failed to download {}: {}", url, e),
            }
        }

        info!("Successfully downloaded {} articles", documents.len());
        Ok(documents)
    }

    async fn draft_script(
        &self,
        topic: &str,
        outline: &PodcastOutline,
        background: &[ContextDocument],
        deep: &[ContextDocument],
        qa_rounds: u32,
    ) -> Result<Vec<DialogueTurn>> {
        self.write_draft_script(topic, outline, background, deep, qa_rounds)
            .await
    }

    async fn final_script(&self, topic: &str, draft: &[DialogueTurn]) -> Result<Vec<ScriptLine>> {
        self.write_final_script(topic, draft).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::RateLimitSettings;
    use crate::pipeline::retrieval::tests::KeywordEmbedder;
    use crate::resilience::ManualClock;
    use crate::sources::SourceType;
    use std::sync::Mutex;

    /// LLM double that answers according to which default prompt it received.
    pub(crate) struct ScriptedLlm {
        prompts: Prompts,
        pub(crate) calls: Mutex<Vec<(String, String)>>,
        /// Number of leading calls that fail before answers are given.
        fail_first: Mutex<u32>,
    }

    impl ScriptedLlm {
        pub(crate) fn new() -> Self {
            Self::failing_first(0)
        }

        pub(crate) fn failing_first(n: u32) -> Self {
            Self {
                prompts: Prompts::default(),
                calls: Mutex::new(Vec::new()),
                fail_first: Mutex::new(n),
            }
        }

        pub(crate) fn user_prompts(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(_, u)| u.clone()).collect()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete_json(&self, system: &str, user: &str) -> Result<serde_json::Value> {
            self.calls.lock().unwrap().push((system.to_string(), user.to_string()));

            {
                let mut remaining = self.fail_first.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(PodgenError::OpenAI("rate limited".to_string()));
                }
            }

            let n = self.calls.lock().unwrap().len();
            let p = &self.prompts;
            let value = if system == p.research.wikipedia.system {
                serde_json::json!({"pages": [{"name": "Tide"}, {"name": "Missing"}, {"name": "Moon"}]})
            } else if system == p.research.search_queries.system {
                serde_json::json!({"queries": [{"query": "tides explained"}, {"query": "moon gravity"}]})
            } else if system == p.outline.system {
                serde_json::json!({"sections": [
                    {"title": "Intro", "subsections": [{"title": "What tides are"}]},
                    {"title": "Depth", "subsections": [{"title": "The moon"}, {"title": "The sun"}]}
                ]})
            } else if system == p.dialogue.interviewer.system {
                serde_json::json!({"question": format!("Question {}?", n)})
            } else if system == p.dialogue.interviewee.system {
                serde_json::json!({"answer": format!("Answer {}.", n)})
            } else if system == p.rewrite.system {
                let lines: Vec<serde_json::Value> = user
                    .lines()
                    .filter_map(|l| {
                        let (speaker, text) = l.split_once(": ")?;
                        if speaker != "Interviewer" && speaker != "Interviewee" {
                            return None;
                        }
                        Some(serde_json::json!({"speaker": speaker, "text": format!("Polished {}", text)}))
                    })
                    .collect();
                serde_json::json!({"lines": lines})
            } else {
                return Err(PodgenError::Llm("unexpected prompt".to_string()));
            };

            Ok(value)
        }
    }

    pub(crate) struct FakeEncyclopedia;

    #[async_trait]
    impl Encyclopedia for FakeEncyclopedia {
        async fn article(&self, title: &str) -> Result<ContextDocument> {
            if title == "Missing" {
                return Err(PodgenError::Research("Article not found: Missing".to_string()));
            }
            Ok(ContextDocument::new(
                title,
                format!("{} article about the moon and the ocean.", title),
                format!("wiki/{}", title),
            ))
        }
    }

    pub(crate) struct FakeSearch;

    #[async_trait]
    impl WebSearch for FakeSearch {
        async fn search(&self, query: &str) -> Result<Vec<String>> {
            Ok(vec![
                "https://shared.example/tides".to_string(),
                format!("https://{}.example/page", query.replace(' ', "-")),
                "https://papers.example/tides.pdf".to_string(),
            ])
        }
    }

    pub(crate) struct FakePages;

    #[async_trait]
    impl DocumentSource for FakePages {
        fn source_type(&self) -> SourceType {
            SourceType::Web
        }

        fn can_handle(&self, _input: &str) -> bool {
            true
        }

        async fn extract(&self, input: &str) -> Result<ContextDocument> {
            if input.contains("moon-gravity") {
                return Err(PodgenError::Extraction("403".to_string()));
            }
            Ok(ContextDocument::new(input, "The wind and the sun.", input))
        }
    }

    pub(crate) fn stages_with(llm: Arc<ScriptedLlm>, max_retries: u32) -> LlmStages {
        let services = StageServices {
            llm: llm.clone(),
            fast_llm: llm,
            embedder: Arc::new(KeywordEmbedder),
            encyclopedia: Arc::new(FakeEncyclopedia),
            search: Arc::new(FakeSearch),
            pages: Arc::new(FakePages),
        };
        let limits = RateLimitSettings {
            requests_per_minute: 0,
            max_retries,
            base_delay_seconds: 1.0,
        };
        LlmStages::with_services(
            services,
            reqwest::Client::new(),
            Prompts::default(),
            PodcastSettings::default(),
            Resilient::from_settings(&limits, Arc::new(ManualClock::new())),
        )
    }

    #[tokio::test]
    async fn test_background_research_skips_missing_articles() {
        let llm = Arc::new(ScriptedLlm::new());
        let stages = stages_with(llm.clone(), 0);

        let docs = stages.background_research("Tides").await.unwrap();

        let titles: Vec<_> = docs.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["Tide", "Moon"]);
        assert!(llm.user_prompts()[0].contains("Topic: Tides"));
    }

    #[tokio::test]
    async fn test_deep_research_dedupes_and_skips_failures() {
        let llm = Arc::new(ScriptedLlm::new());
        let stages = stages_with(llm.clone(), 0);
        let outline = stages.outline("Tides", &[]).await.unwrap();

        let docs = stages.deep_research("Tides", &outline).await.unwrap();

        let sources: Vec<_> = docs.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(
            sources,
            vec!["https://shared.example/tides", "https://tides-explained.example/page"]
        );
        assert!(llm.user_prompts()[1].contains("-- The moon"));
    }

    #[tokio::test]
    async fn test_extract_sources_requires_one_success() {
        let stages = stages_with(Arc::new(ScriptedLlm::new()), 0);
        let result = stages.extract_sources(&["nothing.pptx".to_string()]).await;
        assert!(matches!(result, Err(PodgenError::Extraction(_))));

        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.md");
        std::fs::write(&notes, "# Tides\nThe moon.").unwrap();
        let docs = stages
            .extract_sources(&[notes.to_string_lossy().to_string(), "nothing.pptx".to_string()])
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_llm_calls_are_retried() {
        let llm = Arc::new(ScriptedLlm::failing_first(2));
        let stages = stages_with(llm.clone(), 2);

        let docs = stages.background_research("Tides").await.unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(llm.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_llm_errors_surface_after_retries() {
        let llm = Arc::new(ScriptedLlm::failing_first(5));
        let stages = stages_with(llm.clone(), 1);

        let result = stages.background_research("Tides").await;

        assert!(matches!(result, Err(PodgenError::OpenAI(_))));
        assert_eq!(llm.calls.lock().unwrap().len(), 2);
    }
}
