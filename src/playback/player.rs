use anyhow::Context;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::session::PlaybackEvent;
use super::{AutoplayControl, PlaybackSurface};
use crate::render::parse_clip_file_name;

pub const DEFAULT_PLAYER: &str = "ffplay -nodisp -autoexit -loglevel quiet";

/// External program used to play one clip; the clip path is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PlayerCommand {
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            anyhow::bail!("player command is empty");
        };
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    fn command_for(&self, path: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

impl Default for PlayerCommand {
    fn default() -> Self {
        Self::parse(DEFAULT_PLAYER).unwrap_or_else(|_| Self {
            program: "ffplay".into(),
            args: Vec::new(),
        })
    }
}

#[derive(Debug)]
struct Clip {
    chunk: usize,
    path: PathBuf,
    controls: bool,
    // Closed once the player task has exited.
    playing: Option<oneshot::Sender<()>>,
}

impl Clip {
    fn is_playing(&self) -> bool {
        self.playing.as_ref().is_some_and(|stop| !stop.is_closed())
    }
}

/// Plays clips found in the output directory through an external player.
#[derive(Debug)]
pub struct ClipPlayer {
    dir: PathBuf,
    command: PlayerCommand,
    clips: Vec<Clip>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    ready_hint_shown: bool,
}

impl ClipPlayer {
    pub fn new(
        dir: impl Into<PathBuf>,
        command: PlayerCommand,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> Self {
        Self {
            dir: dir.into(),
            command,
            clips: Vec::new(),
            events,
            ready_hint_shown: false,
        }
    }

    /// Chunk number shown to the user for element `index`.
    fn chunk_label(&self, index: usize) -> usize {
        self.clips.get(index).map_or(index, |c| c.chunk) + 1
    }
}

impl PlaybackSurface for ClipPlayer {
    fn scan(&mut self) -> anyhow::Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(self.clips.len()),
            Err(e) => {
                return Err(e).with_context(|| format!("scanning {}", self.dir.display()));
            }
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(chunk) = entry.file_name().to_str().and_then(parse_clip_file_name) {
                found.push((chunk, entry.path()));
            }
        }
        found.sort_by_key(|(chunk, _)| *chunk);

        for (chunk, path) in found {
            if self.clips.iter().any(|c| c.chunk == chunk) {
                continue;
            }
            debug!("Found clip {}", path.display());
            // Every clip can be started by hand, like a native audio element.
            self.clips.push(Clip {
                chunk,
                path,
                controls: true,
                playing: None,
            });
        }
        Ok(self.clips.len())
    }

    fn is_playing(&self, index: usize) -> bool {
        self.clips.get(index).is_some_and(Clip::is_playing)
    }

    fn play(&mut self, index: usize) -> anyhow::Result<()> {
        for other in 0..self.clips.len() {
            if other != index {
                self.stop(other);
            }
        }
        let label = self.chunk_label(index);
        let Some(clip) = self.clips.get_mut(index) else {
            anyhow::bail!("no clip at position {}", index + 1);
        };
        if let Some(stop) = clip.playing.take() {
            let _ = stop.send(());
        }

        let mut child = self
            .command
            .command_for(&clip.path)
            .spawn()
            .with_context(|| format!("failed to spawn player '{}'", self.command.program))?;
        let (stop_tx, stop_rx) = oneshot::channel();
        clip.playing = Some(stop_tx);
        clip.controls = true;
        info!("Playing chunk {} ({})", label, clip.path.display());

        let events = self.events.clone();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => Some(status),
                _ = stop_rx => None,
            };
            let event = match status {
                None => {
                    let _ = child.kill().await;
                    PlaybackEvent::Stopped(index)
                }
                Some(Ok(status)) if status.success() => PlaybackEvent::Finished(index),
                Some(Ok(status)) => {
                    PlaybackEvent::Failed(index, format!("player exited with {}", status))
                }
                Some(Err(e)) => PlaybackEvent::Failed(index, e.to_string()),
            };
            let _ = events.send(event);
        });
        Ok(())
    }

    fn stop(&mut self, index: usize) {
        if let Some(clip) = self.clips.get_mut(index) {
            if let Some(stop) = clip.playing.take() {
                if stop.send(()).is_ok() {
                    info!("Stopped chunk {}", clip.chunk + 1);
                }
            }
        }
    }

    fn mark_stopped(&mut self, index: usize) {
        if let Some(clip) = self.clips.get_mut(index) {
            if !clip.is_playing() {
                clip.playing = None;
            }
        }
    }

    fn enable_controls(&mut self, index: usize) {
        let label = self.chunk_label(index);
        if let Some(clip) = self.clips.get_mut(index) {
            clip.controls = true;
            if !self.ready_hint_shown {
                self.ready_hint_shown = true;
                info!("Chunk {} is ready - type `play` to start it", label);
            }
        }
    }

    fn controls_enabled(&self, index: usize) -> bool {
        self.clips.get(index).is_some_and(|c| c.controls)
    }

    fn install_control(&mut self, before: usize, control: &AutoplayControl) {
        info!(
            "[{}] {} (above chunk {}, type `t` to toggle)",
            control.label(),
            control.status(),
            self.chunk_label(before)
        );
    }

    fn update_control(&mut self, control: &AutoplayControl) {
        info!("[{}] {}", control.label(), control.status());
    }
}
