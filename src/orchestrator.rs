use thiserror::Error;
use tracing::{debug, info};

use crate::render::RenderSurface;
use crate::tts::{AUDIO_MIME, SpeechSynthesizer, SynthesizedClip};
use crate::utils::chunk_text;

pub const DEFAULT_CHUNK_SIZE: usize = 100;
pub const MIN_CHUNK_SIZE: usize = 10;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter your Groq API key")]
    MissingCredential,
    #[error("Please enter some text to convert")]
    EmptyInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Validating,
    Processing { index: usize, total: usize },
    Done,
}

/// One "generate" action.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub api_key: String,
    pub text: String,
    pub chunk_size: usize,
}

impl GenerateRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingCredential);
        }
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub chunks: usize,
    pub rendered: usize,
    pub progress: f64,
}

/// Drives chunking, synthesis and rendering for a single run at a time.
pub struct Orchestrator<S, R> {
    synthesizer: S,
    surface: R,
    state: RunState,
}

impl<S: SpeechSynthesizer, R: RenderSurface> Orchestrator<S, R> {
    pub fn new(synthesizer: S, surface: R) -> Self {
        Self {
            synthesizer,
            surface,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn synthesizer(&self) -> &S {
        &self.synthesizer
    }

    pub fn surface(&self) -> &R {
        &self.surface
    }

    pub fn into_surface(self) -> R {
        self.surface
    }

    /// Runs one generation. Once validation passes every chunk is attempted:
    /// synthesis and render failures are reported on the surface and skipped.
    pub async fn generate(
        &mut self,
        request: &GenerateRequest,
    ) -> Result<RunSummary, ValidationError> {
        self.state = RunState::Validating;
        if let Err(e) = request.validate() {
            self.surface.warning(&e.to_string());
            self.state = RunState::Idle;
            return Err(e);
        }

        let chunks = chunk_text(&request.text, request.chunk_size);
        let total = chunks.len();
        self.surface.text(&format!("Text split into {} chunks", total));
        info!("Generating speech for {} chunks", total);

        let mut rendered = 0;
        let mut progress = 0.0;
        self.surface.progress(progress);

        for (index, chunk) in chunks.iter().enumerate() {
            self.state = RunState::Processing { index, total };
            self.surface.text(&format!("Processing chunk {}/{}...", index + 1, total));
            debug!("Chunk text: {}", chunk);

            match self.synthesizer.synthesize(chunk, &request.api_key).await {
                Ok(audio) => {
                    let clip = SynthesizedClip { index, audio };
                    self.surface.subheader(&format!("Chunk {}", index + 1));
                    match self.surface.audio(&clip, AUDIO_MIME) {
                        Ok(()) => rendered += 1,
                        Err(e) => self
                            .surface
                            .error(&format!("Could not save chunk {}: {}", index + 1, e)),
                    }
                }
                Err(e) => self.surface.error(&e.to_string()),
            }

            progress = (index + 1) as f64 / total as f64;
            self.surface.progress(progress);
        }

        self.state = RunState::Done;
        self.surface.success("All chunks processed. Audio will play sequentially by default.");
        self.surface.info(
            "Use the autoplay control above the first clip (type `t`) to enable/disable autoplay.",
        );

        Ok(RunSummary {
            chunks: total,
            rendered,
            progress,
        })
    }
}
