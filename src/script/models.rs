//! Data models for episode content.

use serde::{Deserialize, Serialize};

// ============================================================================
// Research Types
// ============================================================================

/// A piece of source material: an article, a web page, a local file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDocument {
    /// Document title.
    pub title: String,
    /// Extracted plain text.
    pub text: String,
    /// URL or path the text came from.
    pub source: String,
}

impl ContextDocument {
    pub fn new(title: impl Into<String>, text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            source: source.into(),
        }
    }

    /// Format for inclusion in a prompt.
    pub fn format_for_prompt(&self) -> String {
        format!("### {}\n\n{}", self.title, self.text)
    }
}

/// Wikipedia article suggested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikipediaPage {
    pub name: String,
}

/// Structured LLM response listing Wikipedia articles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikipediaPages {
    pub pages: Vec<WikipediaPage>,
}

/// Web search query suggested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

/// Structured LLM response listing search queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQueries {
    pub queries: Vec<SearchQuery>,
}

// ============================================================================
// Outline Types
// ============================================================================

/// A subsection in an episode outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodcastSubsection {
    pub title: String,
}

impl PodcastSubsection {
    pub fn render(&self) -> String {
        format!("-- {}", self.title).trim().to_string()
    }
}

/// A top-level section in an episode outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodcastSection {
    pub title: String,
    pub subsections: Vec<PodcastSubsection>,
}

impl PodcastSection {
    pub fn render(&self) -> String {
        let mut lines = vec![self.title.clone()];
        lines.extend(self.subsections.iter().map(PodcastSubsection::render));
        lines.join("\n").trim().to_string()
    }
}

/// The hierarchical outline of an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodcastOutline {
    pub sections: Vec<PodcastSection>,
}

impl PodcastOutline {
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(PodcastSection::render)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    /// Number of (section, subsection) pairs.
    pub fn subsection_count(&self) -> usize {
        self.sections.iter().map(|s| s.subsections.len()).sum()
    }
}

// ============================================================================
// Dialogue Types
// ============================================================================

/// One of the two voices in an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    Interviewer,
    Interviewee,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::Interviewer => write!(f, "Interviewer"),
            Speaker::Interviewee => write!(f, "Interviewee"),
        }
    }
}

/// Structured LLM response for the interviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
}

/// Structured LLM response for the interviewee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
}

/// A turn in the draft discussion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum DialogueTurn {
    Question(Question),
    Answer(Answer),
}

impl DialogueTurn {
    pub fn question(text: impl Into<String>) -> Self {
        DialogueTurn::Question(Question {
            question: text.into(),
        })
    }

    pub fn answer(text: impl Into<String>) -> Self {
        DialogueTurn::Answer(Answer {
            answer: text.into(),
        })
    }

    pub fn speaker(&self) -> Speaker {
        match self {
            DialogueTurn::Question(_) => Speaker::Interviewer,
            DialogueTurn::Answer(_) => Speaker::Interviewee,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            DialogueTurn::Question(q) => q.question.trim(),
            DialogueTurn::Answer(a) => a.answer.trim(),
        }
    }
}

/// A speaker-tagged line of the final script; the unit consumed by TTS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptLine {
    pub speaker: Speaker,
    pub text: String,
}

impl ScriptLine {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

/// Structured LLM response from the rewriter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub lines: Vec<ScriptLine>,
}
