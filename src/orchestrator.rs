//! Pipeline orchestrator for podgen.
//!
//! Runs the generation stages in order, checkpointing each result under the
//! run key so a failed run resumes from the last completed stage, then
//! writes the text and audio outputs.

use crate::checkpoint::{run_key, stage, Checkpointer};
use crate::config::Settings;
use crate::error::{PodgenError, Result};
use crate::pipeline::{LlmStages, Stages};
use crate::script::{generate_markdown_script, ContextDocument, PodcastOutline, ScriptLine};
use crate::tts::{SynthesisReport, TtsEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// Where background material comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationMode {
    /// Research the topic on Wikipedia and the web.
    Research,
    /// Use the supplied files and URLs.
    Context { sources: Vec<String> },
}

/// Parameters of one generation run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: String,
    pub mode: GenerationMode,
    /// Question/answer exchanges per outline subsection.
    pub qa_rounds: u32,
    /// Read and write stage checkpoints.
    pub checkpoint: bool,
    /// Markdown script destination.
    pub text_output: Option<PathBuf>,
    /// Audio destination.
    pub audio_output: Option<PathBuf>,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, mode: GenerationMode) -> Self {
        Self {
            topic: topic.into(),
            mode,
            qa_rounds: 2,
            checkpoint: true,
            text_output: None,
            audio_output: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(PodgenError::InvalidInput("Topic must not be empty".to_string()));
        }
        if let GenerationMode::Context { sources } = &self.mode {
            if sources.is_empty() {
                return Err(PodgenError::InvalidInput(
                    "Context mode requires at least one source".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Outcome of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub run_key: String,
    /// Lines in the final script.
    pub line_count: usize,
    pub text_output: Option<PathBuf>,
    pub audio_output: Option<SynthesisReport>,
}

/// The main orchestrator for the podgen pipeline.
pub struct Orchestrator {
    settings: Settings,
    stages: Arc<dyn Stages>,
    tts: Option<TtsEngine>,
}

impl Orchestrator {
    /// Create an orchestrator backed by the LLM stages.
    ///
    /// The TTS engine is resolved when a run asks for audio.
    pub fn new(settings: Settings) -> Result<Self> {
        let stages: Arc<dyn Stages> = Arc::new(LlmStages::new(&settings)?);
        Ok(Self::with_components(settings, stages, None))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(settings: Settings, stages: Arc<dyn Stages>, tts: Option<TtsEngine>) -> Self {
        Self {
            settings,
            stages,
            tts,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Checkpointer for `topic` and `qa_rounds` using the configured directory.
    pub fn checkpointer(&self, topic: &str, qa_rounds: u32, enabled: bool) -> Checkpointer {
        Checkpointer::new(
            self.settings.checkpoint_dir(),
            run_key(topic, qa_rounds),
            enabled && self.settings.checkpoint.enabled,
        )
    }

    /// Run the full pipeline.
    #[instrument(skip(self, request), fields(topic = %request.topic, qa_rounds = request.qa_rounds))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationReport> {
        request.validate()?;

        // Resolve the TTS provider before spending anything on generation
        let built;
        let tts = match (&request.audio_output, &self.tts) {
            (None, _) => None,
            (Some(_), Some(engine)) => Some(engine),
            (Some(_), None) => {
                built = TtsEngine::from_settings(&self.settings.tts, self.settings.temp_dir())?;
                Some(&built)
            }
        };

        let checkpointer = self.checkpointer(&request.topic, request.qa_rounds, request.checkpoint);
        info!(
            "Generating podcast for '{}' (run key {})",
            request.topic,
            checkpointer.run_key()
        );

        let (outline, script) = self.run_stages(request, &checkpointer).await?;

        let text_output = match &request.text_output {
            Some(path) => {
                self.write_text(&request.topic, &outline, &script, path).await?;
                Some(path.clone())
            }
            None => None,
        };

        let audio_output = match (tts, &request.audio_output) {
            (Some(engine), Some(path)) => {
                info!("Generating audio at {}", path.display());
                Some(engine.convert_to_speech(&script, path).await?)
            }
            _ => None,
        };

        Ok(GenerationReport {
            run_key: checkpointer.run_key().to_string(),
            line_count: script.len(),
            text_output,
            audio_output,
        })
    }

    async fn run_stages(
        &self,
        request: &GenerationRequest,
        checkpointer: &Checkpointer,
    ) -> Result<(PodcastOutline, Vec<ScriptLine>)> {
        let topic = request.topic.as_str();
        let stages = self.stages.as_ref();

        let background: Vec<ContextDocument> = match &request.mode {
            GenerationMode::Research => {
                info!("Researching background information");
                checkpointer
                    .checkpoint(stage::BACKGROUND_INFO, || stages.background_research(topic))
                    .await?
            }
            GenerationMode::Context { sources } => {
                info!("Extracting content from {} sources", sources.len());
                checkpointer
                    .checkpoint(stage::BACKGROUND_INFO, || stages.extract_sources(sources))
                    .await?
            }
        };

        info!("Generating outline");
        let outline = checkpointer
            .checkpoint(stage::OUTLINE, || stages.outline(topic, &background))
            .await?;

        let deep: Vec<ContextDocument> = match &request.mode {
            GenerationMode::Research => {
                info!("Researching discussion topics");
                checkpointer
                    .checkpoint(stage::DEEP_INFO, || stages.deep_research(topic, &outline))
                    .await?
            }
            GenerationMode::Context { .. } => background.clone(),
        };

        info!("Writing draft script");
        let draft = checkpointer
            .checkpoint(stage::DRAFT_SCRIPT, || {
                stages.draft_script(topic, &outline, &background, &deep, request.qa_rounds)
            })
            .await?;

        info!("Writing final script");
        let script = checkpointer
            .checkpoint(stage::FINAL_SCRIPT, || stages.final_script(topic, &draft))
            .await?;

        Ok((outline, script))
    }

    async fn write_text(
        &self,
        topic: &str,
        outline: &PodcastOutline,
        script: &[ScriptLine],
        path: &Path,
    ) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, generate_markdown_script(topic, outline, script)).await?;
        info!("Script saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{ManualClock, Resilient};
    use crate::config::RateLimitSettings;
    use crate::script::{DialogueTurn, PodcastSection, PodcastSubsection, Speaker};
    use crate::tts::{AudioMerger, SpeechSynthesizer};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStages {
        calls: Mutex<Vec<&'static str>>,
        fail_on: Mutex<Option<&'static str>>,
        /// (outline sections, background docs, deep docs, qa rounds) seen by the draft stage.
        draft_inputs: Mutex<Option<(usize, usize, usize, u32)>>,
    }

    impl FakeStages {
        fn record(&self, stage: &'static str) -> Result<()> {
            self.calls.lock().unwrap().push(stage);
            if *self.fail_on.lock().unwrap() == Some(stage) {
                return Err(PodgenError::Llm(format!("{} failed", stage)));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn reset(&self) {
            self.calls.lock().unwrap().clear();
            *self.fail_on.lock().unwrap() = None;
        }
    }

    #[async_trait]
    impl Stages for FakeStages {
        async fn background_research(&self, topic: &str) -> Result<Vec<ContextDocument>> {
            self.record("background_research")?;
            Ok(vec![ContextDocument::new(topic, "background", "wiki")])
        }

        async fn extract_sources(&self, sources: &[String]) -> Result<Vec<ContextDocument>> {
            self.record("extract_sources")?;
            Ok(sources
                .iter()
                .map(|s| ContextDocument::new(s.as_str(), "supplied", s.as_str()))
                .collect())
        }

        async fn outline(&self, _topic: &str, background: &[ContextDocument]) -> Result<PodcastOutline> {
            self.record("outline")?;
            assert!(!background.is_empty());
            Ok(PodcastOutline {
                sections: vec![PodcastSection {
                    title: "Intro".to_string(),
                    subsections: vec![PodcastSubsection { title: "Basics".to_string() }],
                }],
            })
        }

        async fn deep_research(&self, _topic: &str, _outline: &PodcastOutline) -> Result<Vec<ContextDocument>> {
            self.record("deep_research")?;
            Ok(vec![
                ContextDocument::new("a", "deep", "web"),
                ContextDocument::new("b", "deep", "web"),
            ])
        }

        async fn draft_script(
            &self,
            _topic: &str,
            outline: &PodcastOutline,
            background: &[ContextDocument],
            deep: &[ContextDocument],
            qa_rounds: u32,
        ) -> Result<Vec<DialogueTurn>> {
            self.record("draft_script")?;
            *self.draft_inputs.lock().unwrap() =
                Some((outline.sections.len(), background.len(), deep.len(), qa_rounds));
            Ok(vec![DialogueTurn::question("Why?"), DialogueTurn::answer("Because.")])
        }

        async fn final_script(&self, topic: &str, draft: &[DialogueTurn]) -> Result<Vec<ScriptLine>> {
            self.record("final_script")?;
            let mut lines = vec![ScriptLine::new(Speaker::Interviewer, format!("Welcome to {}", topic))];
            lines.extend(draft.iter().map(|t| ScriptLine::new(t.speaker(), t.text())));
            Ok(lines)
        }
    }

    fn settings(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.checkpoint.dir = dir.join("checkpoints").to_string_lossy().to_string();
        settings.general.temp_dir = dir.join("temp").to_string_lossy().to_string();
        settings
    }

    fn orchestrator(dir: &Path, stages: Arc<FakeStages>) -> Orchestrator {
        Orchestrator::with_components(settings(dir), stages, None)
    }

    const RESEARCH_ORDER: [&str; 5] = [
        "background_research",
        "outline",
        "deep_research",
        "draft_script",
        "final_script",
    ];

    #[tokio::test]
    async fn test_research_runs_stages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let stages = Arc::new(FakeStages::default());
        let orchestrator = orchestrator(dir.path(), stages.clone());

        let mut request = GenerationRequest::new("Ocean Tides", GenerationMode::Research);
        request.qa_rounds = 3;
        request.text_output = Some(dir.path().join("out").join("script.md"));

        let report = orchestrator.generate(&request).await.unwrap();

        assert_eq!(stages.calls(), RESEARCH_ORDER);
        assert_eq!(*stages.draft_inputs.lock().unwrap(), Some((1, 1, 2, 3)));
        assert_eq!(report.run_key, "ocean_tides_qa_3");
        assert_eq!(report.line_count, 3);
        assert!(report.audio_output.is_none());

        let markdown = std::fs::read_to_string(dir.path().join("out").join("script.md")).unwrap();
        assert!(markdown.starts_with("# Ocean Tides\n"));
        assert!(markdown.contains("### Section 1: Intro"));
        assert!(markdown.contains("**Interviewee**: Because."));

        let checkpoints = orchestrator.checkpointer("Ocean Tides", 3, true).list().unwrap();
        assert_eq!(checkpoints.len(), 5);
    }

    #[tokio::test]
    async fn test_resume_skips_completed_stages() {
        let dir = tempfile::tempdir().unwrap();
        let stages = Arc::new(FakeStages::default());
        *stages.fail_on.lock().unwrap() = Some("draft_script");
        let orchestrator = orchestrator(dir.path(), stages.clone());
        let request = GenerationRequest::new("Tides", GenerationMode::Research);

        let result = orchestrator.generate(&request).await;
        assert!(matches!(result, Err(PodgenError::Llm(_))));
        assert_eq!(stages.calls(), &RESEARCH_ORDER[..4]);

        stages.reset();
        let report = orchestrator.generate(&request).await.unwrap();

        assert_eq!(stages.calls(), vec!["draft_script", "final_script"]);
        assert_eq!(*stages.draft_inputs.lock().unwrap(), Some((1, 1, 2, 2)));
        assert_eq!(report.line_count, 3);

        // A completed run is served entirely from checkpoints
        stages.reset();
        orchestrator.generate(&request).await.unwrap();
        assert!(stages.calls().is_empty());
    }

    #[tokio::test]
    async fn test_context_mode_reuses_background() {
        let dir = tempfile::tempdir().unwrap();
        let stages = Arc::new(FakeStages::default());
        let orchestrator = orchestrator(dir.path(), stages.clone());
        let request = GenerationRequest::new(
            "Tides",
            GenerationMode::Context {
                sources: vec!["notes.md".to_string(), "https://example.com".to_string()],
            },
        );

        orchestrator.generate(&request).await.unwrap();

        assert_eq!(
            stages.calls(),
            vec!["extract_sources", "outline", "draft_script", "final_script"]
        );
        // Background and deep material are the same two documents
        assert_eq!(*stages.draft_inputs.lock().unwrap(), Some((1, 2, 2, 2)));
        let checkpointer = orchestrator.checkpointer("Tides", 2, true);
        assert!(!checkpointer.path_for("deep_info").exists());
    }

    #[tokio::test]
    async fn test_context_mode_without_sources_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let stages = Arc::new(FakeStages::default());
        let orchestrator = orchestrator(dir.path(), stages.clone());
        let request = GenerationRequest::new("Tides", GenerationMode::Context { sources: vec![] });

        let result = orchestrator.generate(&request).await;

        assert!(matches!(result, Err(PodgenError::InvalidInput(_))));
        assert!(stages.calls().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_checkpointing_reruns_everything() {
        let dir = tempfile::tempdir().unwrap();
        let stages = Arc::new(FakeStages::default());
        let orchestrator = orchestrator(dir.path(), stages.clone());
        let mut request = GenerationRequest::new("Tides", GenerationMode::Research);
        request.checkpoint = false;

        orchestrator.generate(&request).await.unwrap();
        orchestrator.generate(&request).await.unwrap();

        assert_eq!(stages.calls().len(), 10);
        assert!(!dir.path().join("checkpoints").exists());
    }

    struct EchoSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for EchoSynthesizer {
        fn name(&self) -> &str {
            "echo"
        }

        async fn synthesize(&self, lines: &[ScriptLine]) -> Result<Vec<u8>> {
            Ok(lines[0].text.clone().into_bytes())
        }
    }

    struct CopyMerger;

    #[async_trait]
    impl AudioMerger for CopyMerger {
        async fn merge(&self, segments: &[PathBuf], output: &Path) -> Result<()> {
            let mut bytes = Vec::new();
            for segment in segments {
                bytes.extend(std::fs::read(segment)?);
            }
            std::fs::write(output, bytes)?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_audio_output_synthesizes_final_script() {
        let dir = tempfile::tempdir().unwrap();
        let stages = Arc::new(FakeStages::default());
        let limits = RateLimitSettings {
            requests_per_minute: 0,
            max_retries: 0,
            base_delay_seconds: 0.0,
        };
        let engine = TtsEngine::with_components(
            Box::new(EchoSynthesizer),
            Box::new(CopyMerger),
            Resilient::from_settings(&limits, Arc::new(ManualClock::new())),
            dir.path().join("segments"),
        );
        let orchestrator = Orchestrator::with_components(settings(dir.path()), stages, Some(engine));

        let mut request = GenerationRequest::new("Tides", GenerationMode::Research);
        let audio_path = dir.path().join("episode.mp3");
        request.audio_output = Some(audio_path.clone());

        let report = orchestrator.generate(&request).await.unwrap();

        let audio = report.audio_output.unwrap();
        assert_eq!(audio.segments, 3);
        assert_eq!(audio.output, audio_path);
        assert_eq!(
            std::fs::read_to_string(&audio_path).unwrap(),
            "Welcome to TidesWhy?Because."
        );
    }

    #[tokio::test]
    async fn test_unknown_provider_fails_before_any_stage() {
        let dir = tempfile::tempdir().unwrap();
        let stages = Arc::new(FakeStages::default());
        let mut settings = settings(dir.path());
        settings.tts.provider = "espeak".to_string();
        let orchestrator = Orchestrator::with_components(settings, stages.clone(), None);

        let mut request = GenerationRequest::new("Tides", GenerationMode::Research);
        request.audio_output = Some(dir.path().join("episode.mp3"));

        let result = orchestrator.generate(&request).await;

        assert!(matches!(result, Err(PodgenError::UnsupportedProvider(_))));
        assert!(stages.calls().is_empty());
    }
}
