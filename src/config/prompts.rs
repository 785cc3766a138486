//! Prompt templates for podgen.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory:
//! `research.toml`, `outline.toml`, `dialogue.toml` and `rewrite.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub research: ResearchPrompts,
    pub outline: OutlinePrompts,
    pub dialogue: DialoguePrompts,
    pub rewrite: RewritePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// A system/user prompt pair.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Prompts for topic research.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchPrompts {
    pub wikipedia: PromptPair,
    pub search_queries: PromptPair,
}

impl Default for ResearchPrompts {
    fn default() -> Self {
        Self {
            wikipedia: PromptPair {
                system: r#"You are a research assistant preparing background material for a podcast episode.
Suggest Wikipedia articles that together give a thorough grounding in the topic.
Respond with JSON only."#
                    .to_string(),
                user: r#"Topic: {{topic}}

Suggest up to 8 English Wikipedia article titles that would give good background for a podcast on this topic.
Use exact article titles.

Return JSON: {"pages": [{"name": "Article title"}]}"#
                    .to_string(),
            },
            search_queries: PromptPair {
                system: r#"You are a research assistant. Given a podcast outline, you write focused web search queries that will surface in-depth articles for each part of the discussion.
Respond with JSON only."#
                    .to_string(),
                user: r#"Topic: {{topic}}

Podcast outline:
{{outline}}

Write one search query per subsection of the outline.

Return JSON: {"queries": [{"query": "..."}]}"#
                    .to_string(),
            },
        }
    }
}

/// Prompts for outline generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlinePrompts {
    pub system: String,
    pub user: String,
}

impl Default for OutlinePrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an experienced podcast producer. You design episode outlines that flow naturally from an introduction through the main discussion to a conclusion.
Respond with JSON only."#
                .to_string(),
            user: r#"Create a detailed outline for a podcast episode about: {{topic}}

The episode must follow this structure:
{{episode_structure}}

Each section needs 2-5 subsections describing what will be discussed.

Background material:
{{context_documents}}

Return JSON: {"sections": [{"title": "...", "subsections": [{"title": "..."}]}]}"#
                .to_string(),
        }
    }
}

/// Prompts for the simulated interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialoguePrompts {
    pub interviewer: PromptPair,
    pub interviewee: PromptPair,
}

impl Default for DialoguePrompts {
    fn default() -> Self {
        Self {
            interviewer: PromptPair {
                system: r#"You are the host of a podcast interviewing an expert. You ask curious, specific questions that move the conversation forward and build on what the guest just said. Never repeat a question that has already been asked.
Respond with JSON only."#
                    .to_string(),
                user: r#"Podcast topic: {{topic}}

Episode outline:
{{outline}}

We are now discussing section "{{section}}", subsection "{{subsection}}".

Background information:
{{background_info}}

Conversation so far:
{{conversation_history}}

Ask the next question.

Return JSON: {"question": "..."}"#
                    .to_string(),
            },
            interviewee: PromptPair {
                system: r#"You are an expert guest on a podcast. You answer questions accurately and conversationally, drawing on the reference material provided. Do not invent facts that are not supported by the material.
Respond with JSON only."#
                    .to_string(),
                user: r#"Podcast topic: {{topic}}

Episode outline:
{{outline}}

We are now discussing section "{{section}}", subsection "{{subsection}}".

Reference material:
{{background_information}}

Conversation so far:
{{conversation_history}}

Answer this question in about {{word_count}} words:
{{question}}

Return JSON: {"answer": "..."}"#
                    .to_string(),
            },
        }
    }
}

/// Prompts for rewriting the draft into the final script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewritePrompts {
    pub system: String,
    pub user: String,
}

impl Default for RewritePrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a podcast script editor. You rewrite rough interview transcripts into polished, natural-sounding dialogue between an Interviewer and an Interviewee, keeping every fact and the order of the exchange.
Respond with JSON only."#
                .to_string(),
            user: r#"Rewrite this part of the interview so it sounds natural when read aloud. Keep the same speakers and the same order of questions and answers. Avoid markdown formatting.

{{script}}

Return JSON: {"lines": [{"speaker": "Interviewer", "text": "..."}, {"speaker": "Interviewee", "text": "..."}]}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let research_path = custom_path.join("research.toml");
            if research_path.exists() {
                let content = std::fs::read_to_string(&research_path)?;
                prompts.research = toml::from_str(&content)?;
            }

            let outline_path = custom_path.join("outline.toml");
            if outline_path.exists() {
                let content = std::fs::read_to_string(&outline_path)?;
                prompts.outline = toml::from_str(&content)?;
            }

            let dialogue_path = custom_path.join("dialogue.toml");
            if dialogue_path.exists() {
                let content = std::fs::read_to_string(&dialogue_path)?;
                prompts.dialogue = toml::from_str(&content)?;
            }

            let rewrite_path = custom_path.join("rewrite.toml");
            if rewrite_path.exists() {
                let content = std::fs::read_to_string(&rewrite_path)?;
                prompts.rewrite = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render with custom config variables; provided variables take precedence.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.outline.user.contains("{{episode_structure}}"));
        assert!(prompts.dialogue.interviewee.user.contains("{{question}}"));
        assert!(!prompts.rewrite.system.is_empty());
    }

    #[test]
    fn test_render_prefers_provided_variables() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("host".to_string(), "Sam".to_string());
        prompts.variables.insert("topic".to_string(), "ignored".to_string());

        let vars = HashMap::from([("topic".to_string(), "tides".to_string())]);
        let rendered = prompts.render_with_custom("{{host}} talks about {{topic}}", &vars);

        assert_eq!(rendered, "Sam talks about tides");
    }

    #[test]
    fn test_custom_dir_overrides_outline() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("outline.toml"),
            "system = \"custom system\"\nuser = \"custom {{topic}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();

        assert_eq!(prompts.outline.system, "custom system");
        // Untouched files keep their defaults
        assert!(prompts.rewrite.user.contains("{{script}}"));
    }
}
