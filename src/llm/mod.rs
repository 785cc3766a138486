//! Language model access.
//!
//! Every pipeline stage talks to the model through [`LanguageModel`], which
//! takes a system and user prompt and returns a JSON object. [`generate`]
//! decodes that object into the stage's response type.

mod openai;

pub use openai::OpenAIChat;

use crate::error::{PodgenError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// A chat model that answers with a JSON object.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logging.
    fn name(&self) -> &str;

    /// Run one completion and parse the reply as JSON.
    async fn complete_json(&self, system: &str, user: &str) -> Result<serde_json::Value>;
}

/// Run a completion and decode it into `T`.
pub async fn generate<T: DeserializeOwned>(
    llm: &dyn LanguageModel,
    system: &str,
    user: &str,
) -> Result<T> {
    let value = llm.complete_json(system, user).await?;
    serde_json::from_value(value).map_err(|e| {
        PodgenError::Llm(format!(
            "{} returned an unexpected structure: {}",
            llm.name(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{Question, WikipediaPages};

    struct Canned(serde_json::Value);

    #[async_trait]
    impl LanguageModel for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete_json(&self, _system: &str, _user: &str) -> Result<serde_json::Value> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_generate_decodes_structure() {
        let llm = Canned(serde_json::json!({"pages": [{"name": "Tide"}, {"name": "Moon"}]}));
        let pages: WikipediaPages = generate(&llm, "s", "u").await.unwrap();
        assert_eq!(pages.pages.len(), 2);
        assert_eq!(pages.pages[1].name, "Moon");
    }

    #[tokio::test]
    async fn test_generate_rejects_wrong_shape() {
        let llm = Canned(serde_json::json!({"answer": "no question here"}));
        let result = generate::<Question>(&llm, "s", "u").await;
        assert!(matches!(result, Err(PodgenError::Llm(msg)) if msg.contains("canned")));
    }
}
