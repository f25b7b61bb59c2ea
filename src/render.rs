use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, error, info, warn};

use crate::tts::SynthesizedClip;

static CLIP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^chunk_(\d+)\.mp3(\.part)?$").unwrap());

/// File name of the clip rendered from chunk `index` (0-based).
pub fn clip_file_name(index: usize) -> String {
    format!("chunk_{:03}.mp3", index + 1)
}

/// Recovers the 0-based chunk index from a finished clip file name.
pub fn parse_clip_file_name(name: &str) -> Option<usize> {
    let caps = CLIP_NAME.captures(name)?;
    if caps.get(2).is_some() {
        return None;
    }
    let number: usize = caps[1].parse().ok()?;
    number.checked_sub(1)
}

/// Where the orchestrator reports progress and puts audio.
pub trait RenderSurface {
    fn text(&mut self, message: &str);
    fn subheader(&mut self, title: &str);
    fn warning(&mut self, message: &str);
    fn error(&mut self, message: &str);
    fn success(&mut self, message: &str);
    fn info(&mut self, message: &str);
    /// `fraction` is in `0.0..=1.0`.
    fn progress(&mut self, fraction: f64);
    fn audio(&mut self, clip: &SynthesizedClip, mime: &str) -> io::Result<()>;
}

/// Renders messages to the log and clips into a directory.
#[derive(Debug)]
pub struct DirectorySurface {
    dir: PathBuf,
}

impl DirectorySurface {
    /// Creates `dir` if needed and clears clips left over from an earlier run.
    pub fn create(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_str().is_some_and(|n| CLIP_NAME.is_match(n)) {
                debug!("Removing stale clip {:?}", entry.path());
                fs::remove_file(entry.path())?;
            }
        }
        info!("Writing clips to {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RenderSurface for DirectorySurface {
    fn text(&mut self, message: &str) {
        info!("{}", message);
    }

    fn subheader(&mut self, title: &str) {
        info!("== {} ==", title);
    }

    fn warning(&mut self, message: &str) {
        warn!("{}", message);
    }

    fn error(&mut self, message: &str) {
        error!("{}", message);
    }

    fn success(&mut self, message: &str) {
        info!("{}", message);
    }

    fn info(&mut self, message: &str) {
        info!("{}", message);
    }

    fn progress(&mut self, fraction: f64) {
        info!("Progress: {:.0}%", fraction.clamp(0.0, 1.0) * 100.0);
    }

    fn audio(&mut self, clip: &SynthesizedClip, mime: &str) -> io::Result<()> {
        let path = self.dir.join(clip_file_name(clip.index));
        let partial = path.with_extension("mp3.part");
        // Rename into place so a scan never picks up a half-written clip.
        fs::write(&partial, &clip.audio)?;
        fs::rename(&partial, &path)?;
        info!(
            "Rendered {} ({} bytes, {})",
            path.display(),
            clip.audio.len(),
            mime
        );
        Ok(())
    }
}
