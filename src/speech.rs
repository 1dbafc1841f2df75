use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::db::VoiceName;
use crate::error::{AppError, Result};
use crate::Config;

/// Text-to-speech and speech-to-text, bundled because both sides of the voice
/// conversation go through the same provider.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize `text` as mp3 audio in the given voice.
    async fn synthesize(&self, text: &str, voice: VoiceName) -> Result<Vec<u8>>;

    /// Transcribe recorded audio to text.
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// DeepInfra client speaking the OpenAI-compatible audio endpoints.
pub struct DeepInfraSpeech {
    client: Client,
    base_url: String,
    api_key: String,
    tts_model: String,
    stt_model: String,
}

impl DeepInfraSpeech {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AppError::provider("deepinfra", e))?;
        Ok(Self {
            client,
            base_url: config.deepinfra_url.trim_end_matches('/').to_string(),
            api_key: config.deepinfra_api_key.clone(),
            tts_model: config.tts_model.clone(),
            stt_model: config.stt_model.clone(),
        })
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait]
impl SpeechProvider for DeepInfraSpeech {
    async fn synthesize(&self, text: &str, voice: VoiceName) -> Result<Vec<u8>> {
        let request = SpeechRequest {
            model: &self.tts_model,
            voice: voice.as_str(),
            input: text,
            response_format: "mp3",
        };
        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::provider("deepinfra", e))?;

        if !response.status().is_success() {
            return Err(AppError::provider(
                "deepinfra",
                format!("TTS status {}", response.status()),
            ));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::provider("deepinfra", e))?;
        Ok(bytes.to_vec())
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let part = Part::bytes(audio.to_vec())
            .file_name("audio.mp3")
            .mime_str("audio/mpeg")
            .map_err(|e| AppError::provider("deepinfra", e))?;
        let form = Form::new()
            .text("model", self.stt_model.clone())
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::provider("deepinfra", e))?;

        if !response.status().is_success() {
            return Err(AppError::provider(
                "deepinfra",
                format!("STT status {}", response.status()),
            ));
        }
        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| AppError::provider("deepinfra", e))?;
        Ok(body.text)
    }
}
