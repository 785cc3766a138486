//! OpenAI speech endpoint.

use super::google::single_line;
use super::SpeechSynthesizer;
use crate::config::VoiceSettings;
use crate::error::{PodgenError, Result};
use crate::openai::require_api_key;
use crate::script::ScriptLine;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

pub struct OpenAITts {
    http: reqwest::Client,
    voices: VoiceSettings,
}

impl OpenAITts {
    pub fn new(http: reqwest::Client, voices: VoiceSettings) -> Self {
        Self { http, voices }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAITts {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip_all, fields(lines = lines.len()))]
    async fn synthesize(&self, lines: &[ScriptLine]) -> Result<Vec<u8>> {
        let line = single_line(lines)?;
        let api_key = require_api_key("OPENAI_API_KEY")?;

        let response = self
            .http
            .post(SPEECH_URL)
            .bearer_auth(api_key)
            .json(&SpeechRequest {
                model: self.voices.model.as_deref().unwrap_or("tts-1"),
                input: &line.text,
                voice: self.voices.voice_for(line.speaker),
                response_format: "mp3",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PodgenError::Synthesis(format!(
                "OpenAI speech returned {}: {}",
                status, body
            )));
        }

        let audio = response.bytes().await?.to_vec();
        debug!("Received {} bytes of audio", audio.len());
        Ok(audio)
    }
}
