use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

use crate::orchestrator::{DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::playback::player::DEFAULT_PLAYER;
use crate::tts::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_VOICE};

#[derive(Parser, Debug)]
#[clap(about = "Split text into word chunks, synthesize each chunk and play the clips in order")]
pub struct Args {
    /// API key for the speech endpoint
    #[clap(long, env = "GROQ_API_KEY", hide_env_values = true, default_value = "")]
    pub api_key: String,

    /// Text to convert (read from --input or stdin when omitted)
    #[clap(long, conflicts_with = "input")]
    pub text: Option<String>,

    /// File holding the text to convert
    #[clap(long)]
    pub input: Option<PathBuf>,

    /// Words per chunk
    #[clap(long, default_value_t = DEFAULT_CHUNK_SIZE as u64,
           value_parser = clap::value_parser!(u64).range(MIN_CHUNK_SIZE as u64..))]
    pub chunk_size: u64,

    /// Directory receiving the rendered clips
    #[clap(long, default_value = "tts_out")]
    pub out: PathBuf,

    #[clap(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    #[clap(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    #[clap(long, default_value = DEFAULT_VOICE)]
    pub voice: String,

    /// Player command line; the clip path is appended
    #[clap(long, default_value = DEFAULT_PLAYER)]
    pub player: String,

    /// Milliseconds between scans for new clips
    #[clap(long, default_value_t = 1000)]
    pub poll_ms: u64,

    /// Start playing the first clip as soon as it is ready
    #[clap(long)]
    pub autostart: bool,

    /// Only write the clips, do not play them
    #[clap(long)]
    pub no_play: bool,
}

impl Args {
    /// True when the text comes from stdin, which then cannot carry commands.
    pub fn text_from_stdin(&self) -> bool {
        self.text.is_none() && self.input.is_none()
    }

    pub fn read_text(&self) -> anyhow::Result<String> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        if let Some(path) = &self.input {
            return Ok(std::fs::read_to_string(path)?);
        }
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    }
}
