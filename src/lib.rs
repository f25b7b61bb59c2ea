pub mod args;
pub mod orchestrator;
pub mod playback;
pub mod render;
pub mod tts;
pub mod utils;

pub use orchestrator::{GenerateRequest, Orchestrator, RunState, RunSummary, ValidationError};
pub use render::{DirectorySurface, RenderSurface};
pub use tts::{SpeechClient, SpeechSynthesizer, SynthesisError, SynthesizedClip, VoiceSelection};
pub use utils::chunk_text;
