//! Sequential playback of rendered clips.
//!
//! The [`PlaybackController`] watches a [`PlaybackSurface`] for new clips and
//! chains them: when clip `i` finishes and autoplay is on, clip `i + 1`
//! starts. It never removes or reorders clips.

pub mod player;
pub mod session;

use std::collections::BTreeSet;
use tracing::{debug, info};

pub use player::{ClipPlayer, PlayerCommand};
pub use session::{PlaybackEvent, SessionOptions, UserCommand, run_session};

/// Something that shows clips, plays them and hosts the autoplay control.
pub trait PlaybackSurface {
    /// Refreshes the element list and returns how many elements exist now.
    fn scan(&mut self) -> anyhow::Result<usize>;
    fn is_playing(&self, index: usize) -> bool;
    fn play(&mut self, index: usize) -> anyhow::Result<()>;
    /// Stops `index` without emitting a finished event.
    fn stop(&mut self, index: usize);
    /// Records that `index` is no longer playing.
    fn mark_stopped(&mut self, index: usize);
    fn enable_controls(&mut self, index: usize);
    fn controls_enabled(&self, index: usize) -> bool;
    fn install_control(&mut self, before: usize, control: &AutoplayControl);
    fn update_control(&mut self, control: &AutoplayControl);
}

/// Page-lifetime flag deciding whether a finished clip starts the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoplayState {
    enabled: bool,
}

impl Default for AutoplayState {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AutoplayState {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn flip(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }
}

/// What the toggle control shows for a given autoplay state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoplayControl {
    pub enabled: bool,
}

impl AutoplayControl {
    pub fn label(&self) -> &'static str {
        if self.enabled {
            "Disable Autoplay"
        } else {
            "Enable Autoplay"
        }
    }

    pub fn status(&self) -> &'static str {
        if self.enabled {
            "Autoplay is enabled - chunks will play sequentially"
        } else {
            "Autoplay is disabled - chunks will not play automatically"
        }
    }
}

/// Result of a finished transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play(usize),
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Ready {
        elements: usize,
        bound: BTreeSet<usize>,
        current: usize,
    },
}

#[derive(Debug)]
pub struct PlaybackController {
    state: ControllerState,
    autoplay: AutoplayState,
    control_installed: bool,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new(AutoplayState::default())
    }
}

impl PlaybackController {
    pub fn new(autoplay: AutoplayState) -> Self {
        Self {
            state: ControllerState::Uninitialized,
            autoplay,
            control_installed: false,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn autoplay(&self) -> AutoplayState {
        self.autoplay
    }

    pub fn control(&self) -> AutoplayControl {
        AutoplayControl {
            enabled: self.autoplay.is_enabled(),
        }
    }

    pub fn element_count(&self) -> usize {
        match &self.state {
            ControllerState::Uninitialized => 0,
            ControllerState::Ready { elements, .. } => *elements,
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        match &self.state {
            ControllerState::Uninitialized => None,
            ControllerState::Ready { current, .. } => Some(*current),
        }
    }

    pub fn is_bound(&self, index: usize) -> bool {
        matches!(&self.state, ControllerState::Ready { bound, .. } if bound.contains(&index))
    }

    /// One discovery tick. Rebinds when the surface grew, installs the
    /// control on the first non-empty scan and keeps the first clip
    /// controllable while nothing plays. Returns the element count.
    pub fn discover<S: PlaybackSurface>(&mut self, surface: &mut S) -> anyhow::Result<usize> {
        let found = surface.scan()?;
        if found > self.element_count() {
            debug!("Discovered {} clips (was {})", found, self.element_count());
            self.grow(found);
            for index in 0..found {
                self.bind(index);
            }
            if !self.control_installed {
                surface.install_control(0, &self.control());
                self.control_installed = true;
            }
        }

        let elements = self.element_count();
        if elements > 0 && !(0..elements).any(|i| surface.is_playing(i)) {
            surface.enable_controls(0);
        }
        Ok(elements)
    }

    fn grow(&mut self, elements: usize) {
        if let ControllerState::Ready { elements: known, .. } = &mut self.state {
            *known = elements;
        } else {
            self.state = ControllerState::Ready {
                elements,
                bound: BTreeSet::new(),
                current: 0,
            };
        }
    }

    /// Attaches the finished handler to `index`. Binding twice is a no-op,
    /// so one finished event always advances at most one step.
    pub fn bind(&mut self, index: usize) -> bool {
        match &mut self.state {
            ControllerState::Ready { elements, bound, .. } if index < *elements => {
                let fresh = bound.insert(index);
                if fresh {
                    debug!("Bound clip {}", index + 1);
                }
                fresh
            }
            _ => false,
        }
    }

    /// Transition for "element `index` finished playing".
    pub fn on_finished(&mut self, index: usize) -> Command {
        let ControllerState::Ready {
            elements,
            bound,
            current,
        } = &mut self.state
        else {
            return Command::Nothing;
        };
        if !bound.contains(&index) || !self.autoplay.is_enabled() || index + 1 >= *elements {
            return Command::Nothing;
        }
        *current = index + 1;
        Command::Play(index + 1)
    }

    /// Applies [`Self::on_finished`] to the surface.
    pub fn handle_finished<S: PlaybackSurface>(
        &mut self,
        index: usize,
        surface: &mut S,
    ) -> anyhow::Result<Command> {
        let command = self.on_finished(index);
        if let Command::Play(next) = command {
            info!("Clip {} finished, playing clip {}", index + 1, next + 1);
            surface.play(next)?;
        }
        Ok(command)
    }

    /// Flips autoplay and refreshes the control. Never touches playing clips.
    pub fn toggle<S: PlaybackSurface>(&mut self, surface: &mut S) -> bool {
        let enabled = self.autoplay.flip();
        if self.control_installed {
            surface.update_control(&self.control());
        }
        enabled
    }
}
