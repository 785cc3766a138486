//! Google Cloud Text-to-Speech, single-voice and multi-speaker.

use super::SpeechSynthesizer;
use crate::config::VoiceSettings;
use crate::error::{PodgenError, Result};
use crate::openai::require_api_key;
use crate::script::ScriptLine;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const SYNTHESIZE_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";
const SYNTHESIZE_BETA_URL: &str = "https://texttospeech.googleapis.com/v1beta1/text:synthesize";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum SynthesisInput<'a> {
    Text(&'a str),
    MultiSpeakerMarkup { turns: Vec<Turn<'a>> },
}

#[derive(Serialize)]
struct Turn<'a> {
    text: &'a str,
    speaker: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig<'a> {
    audio_encoding: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    effects_profile_id: Vec<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// POST a synthesis request and decode the returned audio.
async fn synthesize(http: &reqwest::Client, url: &str, request: &SynthesizeRequest<'_>) -> Result<Vec<u8>> {
    let api_key = require_api_key("GOOGLE_API_KEY")?;

    let response = http
        .post(url)
        .query(&[("key", api_key)])
        .json(request)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(PodgenError::Synthesis(format!(
            "Google TTS returned {}: {}",
            status, body
        )));
    }

    let parsed: SynthesizeResponse = response.json().await?;
    base64::engine::general_purpose::STANDARD
        .decode(parsed.audio_content)
        .map_err(|e| PodgenError::Synthesis(format!("Invalid audio content: {}", e)))
}

fn effects(voices: &VoiceSettings) -> Vec<&str> {
    voices.effects_profile_id.as_deref().into_iter().collect()
}

/// One line per call, voice chosen by speaker.
pub struct GoogleTts {
    http: reqwest::Client,
    voices: VoiceSettings,
}

impl GoogleTts {
    pub fn new(http: reqwest::Client, voices: VoiceSettings) -> Self {
        Self { http, voices }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    fn name(&self) -> &str {
        "google"
    }

    #[instrument(skip_all, fields(lines = lines.len()))]
    async fn synthesize(&self, lines: &[ScriptLine]) -> Result<Vec<u8>> {
        let line = single_line(lines)?;

        let request = SynthesizeRequest {
            input: SynthesisInput::Text(&line.text),
            voice: VoiceSelection {
                language_code: &self.voices.language_code,
                name: self.voices.voice_for(line.speaker),
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                effects_profile_id: effects(&self.voices),
            },
        };

        let audio = synthesize(&self.http, SYNTHESIZE_URL, &request).await?;
        debug!("Received {} bytes of audio", audio.len());
        Ok(audio)
    }
}

/// Several speaker-tagged turns per call.
pub struct GoogleMultiSpeakerTts {
    http: reqwest::Client,
    voices: VoiceSettings,
    batch_size: usize,
}

impl GoogleMultiSpeakerTts {
    pub fn new(http: reqwest::Client, voices: VoiceSettings, batch_size: usize) -> Self {
        Self {
            http,
            voices,
            batch_size: batch_size.max(1),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleMultiSpeakerTts {
    fn name(&self) -> &str {
        "google_multispeaker"
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[instrument(skip_all, fields(lines = lines.len()))]
    async fn synthesize(&self, lines: &[ScriptLine]) -> Result<Vec<u8>> {
        let turns = lines
            .iter()
            .map(|line| Turn {
                text: &line.text,
                speaker: self.voices.voice_for(line.speaker),
            })
            .collect();

        let request = SynthesizeRequest {
            input: SynthesisInput::MultiSpeakerMarkup { turns },
            voice: VoiceSelection {
                language_code: &self.voices.language_code,
                name: self
                    .voices
                    .model
                    .as_deref()
                    .unwrap_or("en-US-Studio-MultiSpeaker"),
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3_64_KBPS",
                effects_profile_id: effects(&self.voices),
            },
        };

        let audio = synthesize(&self.http, SYNTHESIZE_BETA_URL, &request).await?;
        debug!("Received {} bytes of audio", audio.len());
        Ok(audio)
    }
}

/// The only line of a single-voice request.
pub(super) fn single_line(lines: &[ScriptLine]) -> Result<&ScriptLine> {
    match lines {
        [line] => Ok(line),
        _ => Err(PodgenError::Synthesis(format!(
            "Single-voice provider expects one line per call, got {}",
            lines.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Speaker;

    #[test]
    fn test_single_voice_request_shape() {
        let voices = VoiceSettings::google();
        let request = SynthesizeRequest {
            input: SynthesisInput::Text("Hello"),
            voice: VoiceSelection {
                language_code: &voices.language_code,
                name: voices.voice_for(Speaker::Interviewee),
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                effects_profile_id: effects(&voices),
            },
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "input": {"text": "Hello"},
                "voice": {"languageCode": "en-US", "name": "en-US-Journey-D"},
                "audioConfig": {
                    "audioEncoding": "MP3",
                    "effectsProfileId": ["small-bluetooth-speaker-class-device"]
                }
            })
        );
    }

    #[test]
    fn test_multispeaker_markup_shape() {
        let input = SynthesisInput::MultiSpeakerMarkup {
            turns: vec![Turn { text: "Hi", speaker: "R" }, Turn { text: "Hello", speaker: "S" }],
        };

        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            serde_json::json!({"multiSpeakerMarkup": {"turns": [
                {"text": "Hi", "speaker": "R"},
                {"text": "Hello", "speaker": "S"}
            ]}})
        );
    }

    #[test]
    fn test_single_line_rejects_batches() {
        let lines = vec![
            ScriptLine::new(Speaker::Interviewer, "a"),
            ScriptLine::new(Speaker::Interviewee, "b"),
        ];
        assert!(single_line(&lines).is_err());
        assert!(single_line(&lines[..1]).is_ok());
        assert!(single_line(&[]).is_err());
    }
}
