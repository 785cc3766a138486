//! OpenAI embeddings for the draft-stage retrieval index.

use super::Embedder;
use crate::error::{PodgenError, Result};
use crate::openai::create_client;
use crate::resilience::Resilient;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Texts per embeddings request.
const BATCH_SIZE: usize = 100;

/// Embeds document chunks and questions with an OpenAI embedding model.
///
/// Every request is paced and retried through its own [`Resilient`].
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    calls: Resilient,
}

impl OpenAIEmbedder {
    pub fn new(model: &str, calls: Resilient) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            calls,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = input.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(input))
            .build()
            .map_err(|e| PodgenError::OpenAI(format!("Failed to build request: {}", e)))?;

        let client = &self.client;
        let request = &request;
        let response = self
            .calls
            .call("embeddings", || async move {
                client
                    .embeddings()
                    .create(request.clone())
                    .await
                    .map_err(|e| PodgenError::OpenAI(format!("Embedding API error: {}", e)))
            })
            .await?;

        let mut data = response.data;
        if data.len() != expected {
            return Err(PodgenError::OpenAI(format!(
                "Expected {} embeddings, got {}",
                expected,
                data.len()
            )));
        }
        data.sort_by_key(|e| e.index);
        Ok(data.into_iter().map(|e| e.embedding).collect())
    }
}

/// Flatten newlines and substitute a single space for blank input, which the
/// embeddings endpoint rejects.
fn prepare_input(text: &str) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    if flat.trim().is_empty() {
        " ".to_string()
    } else {
        flat
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(vec![prepare_input(text)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PodgenError::OpenAI("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let input = batch.iter().map(|t| prepare_input(t)).collect();
            embeddings.extend(self.request(input).await?);
        }

        debug!("Embedded {} chunks", embeddings.len());
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitSettings;
    use crate::resilience::ManualClock;
    use std::sync::Arc;

    #[test]
    fn test_embedder_creation() {
        let calls = Resilient::from_settings(&RateLimitSettings::default(), Arc::new(ManualClock::new()));
        let embedder = OpenAIEmbedder::new("text-embedding-3-small", calls).unwrap();
        assert_eq!(embedder.model(), "text-embedding-3-small");
    }

    #[test]
    fn test_prepare_input() {
        assert_eq!(prepare_input("tides\nand\r\nmoons"), "tides and  moons");
        assert_eq!(prepare_input("\n\n"), " ");
        assert_eq!(prepare_input(""), " ");
    }
}
