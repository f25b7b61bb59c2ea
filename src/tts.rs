use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/audio/speech";
pub const DEFAULT_MODEL: &str = "play-tts";
pub const DEFAULT_VOICE: &str = "Arthur-PlayAI";

/// Declared MIME type of every synthesized clip.
pub const AUDIO_MIME: &str = "audio/mp3";

#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The endpoint answered with a non-success status.
    #[error("API Error: {status} - {body}")]
    Http { status: u16, body: String },
    /// The request never produced a response (connection, timeout, body read).
    #[error("Request Error: {0}")]
    Transport(String),
}

/// Audio returned for one chunk, tagged with the chunk's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedClip {
    pub index: usize,
    pub audio: Vec<u8>,
}

/// Model and voice sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSelection {
    pub model: String,
    pub voice: String,
}

impl Default for VoiceSelection {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
        }
    }
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Turns one chunk of text into raw audio bytes.
    async fn synthesize(&self, chunk: &str, api_key: &str) -> Result<Vec<u8>, SynthesisError>;
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
}

/// Client for an OpenAI-compatible `/audio/speech` endpoint.
#[derive(Debug, Clone)]
pub struct SpeechClient {
    http: reqwest::Client,
    endpoint: String,
    selection: VoiceSelection,
}

impl SpeechClient {
    pub fn new(endpoint: impl Into<String>, selection: VoiceSelection) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            selection,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn selection(&self) -> &VoiceSelection {
        &self.selection
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechClient {
    async fn synthesize(&self, chunk: &str, api_key: &str) -> Result<Vec<u8>, SynthesisError> {
        let payload = SpeechRequest {
            model: &self.selection.model,
            input: chunk,
            voice: &self.selection.voice,
        };
        debug!(
            "POST {} (model {}, voice {}, {} chars)",
            self.endpoint,
            payload.model,
            payload.voice,
            chunk.len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| SynthesisError::Transport(e.to_string()))?;
            debug!("Received {} bytes of audio", bytes.len());
            return Ok(bytes.to_vec());
        }

        let body = response.text().await.unwrap_or_default();
        error!("Speech endpoint returned {}", status);
        Err(SynthesisError::Http {
            status: status.as_u16(),
            body,
        })
    }
}
