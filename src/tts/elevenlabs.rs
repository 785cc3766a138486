//! ElevenLabs text-to-speech.

use super::google::single_line;
use super::SpeechSynthesizer;
use crate::config::VoiceSettings;
use crate::error::{PodgenError, Result};
use crate::openai::require_api_key;
use crate::script::ScriptLine;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

const API_BASE: &str = "https://api.elevenlabs.io/v1";
const DEFAULT_MODEL: &str = "eleven_multilingual_v2";

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Deserialize)]
struct VoicesResponse {
    voices: Vec<VoiceEntry>,
}

#[derive(Deserialize)]
struct VoiceEntry {
    voice_id: String,
    name: String,
}

/// ElevenLabs synthesizer. Voices may be given by name or by ID.
pub struct ElevenLabsTts {
    http: reqwest::Client,
    voices: VoiceSettings,
    /// Voice name to ID, fetched on first use.
    voice_ids: OnceCell<HashMap<String, String>>,
}

impl ElevenLabsTts {
    pub fn new(http: reqwest::Client, voices: VoiceSettings) -> Self {
        Self {
            http,
            voices,
            voice_ids: OnceCell::new(),
        }
    }

    async fn fetch_voice_ids(&self) -> Result<HashMap<String, String>> {
        let api_key = require_api_key("ELEVENLABS_API_KEY")?;
        let response = self
            .http
            .get(format!("{}/voices", API_BASE))
            .header("xi-api-key", api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PodgenError::Synthesis(format!(
                "ElevenLabs voice listing returned {}",
                response.status()
            )));
        }

        let parsed: VoicesResponse = response.json().await?;
        info!("Loaded {} ElevenLabs voices", parsed.voices.len());
        Ok(index_voices(parsed.voices))
    }

    async fn resolve_voice(&self, voice: &str) -> Result<String> {
        let ids = self
            .voice_ids
            .get_or_try_init(|| self.fetch_voice_ids())
            .await?;
        lookup_voice(ids, voice)
    }
}

fn index_voices(voices: Vec<VoiceEntry>) -> HashMap<String, String> {
    voices
        .into_iter()
        .map(|v| (v.name.to_lowercase(), v.voice_id))
        .collect()
}

/// Map a configured voice to an ID: names match case-insensitively, and
/// anything that is already a known ID passes through.
fn lookup_voice(ids: &HashMap<String, String>, voice: &str) -> Result<String> {
    if let Some(id) = ids.get(&voice.to_lowercase()) {
        return Ok(id.clone());
    }
    if ids.values().any(|id| id == voice) {
        return Ok(voice.to_string());
    }
    Err(PodgenError::Config(format!("Unknown ElevenLabs voice: {}", voice)))
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsTts {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    #[instrument(skip_all, fields(lines = lines.len()))]
    async fn synthesize(&self, lines: &[ScriptLine]) -> Result<Vec<u8>> {
        let line = single_line(lines)?;
        let voice_id = self.resolve_voice(self.voices.voice_for(line.speaker)).await?;
        let api_key = require_api_key("ELEVENLABS_API_KEY")?;

        let response = self
            .http
            .post(format!("{}/text-to-speech/{}", API_BASE, voice_id))
            .query(&[("output_format", "mp3_44100_128")])
            .header("xi-api-key", api_key)
            .json(&SpeechRequest {
                text: &line.text,
                model_id: self.voices.model.as_deref().unwrap_or(DEFAULT_MODEL),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PodgenError::Synthesis(format!(
                "ElevenLabs returned {}: {}",
                status, body
            )));
        }

        let audio = response.bytes().await?.to_vec();
        debug!("Received {} bytes of audio", audio.len());
        Ok(audio)
    }
}
