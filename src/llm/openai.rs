//! OpenAI chat completions in JSON mode.

use super::LanguageModel;
use crate::error::{PodgenError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Chat model backed by the OpenAI API.
pub struct OpenAIChat {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChat {
    pub fn new(model: &str) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            temperature: 0.7,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl LanguageModel for OpenAIChat {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn complete_json(&self, system: &str, user: &str) -> Result<serde_json::Value> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| PodgenError::Llm(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| PodgenError::Llm(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .response_format(ResponseFormat::JsonObject)
            .build()
            .map_err(|e| PodgenError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PodgenError::OpenAI(format!("Chat completion error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| PodgenError::Llm("Empty response".to_string()))?;

        debug!("Received {} chars from {}", content.len(), self.model);

        serde_json::from_str(content)
            .map_err(|e| PodgenError::Llm(format!("Invalid JSON from {}: {}", self.model, e)))
    }
}
