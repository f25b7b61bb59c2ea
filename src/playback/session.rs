use std::io::BufRead;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{PlaybackController, PlaybackSurface};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

const COMMAND_HELP: &str = "commands: t (toggle autoplay), p [n] (play chunk n), s (stop), q (quit)";

/// Reported by a surface about one of its elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Finished(usize),
    Stopped(usize),
    Failed(usize, String),
}

/// What the user can type while clips play. `Play` holds a 0-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Toggle,
    Play(usize),
    Stop,
    Quit,
}

impl FromStr for UserCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = match words.next() {
            Some("t" | "toggle") => UserCommand::Toggle,
            Some("s" | "stop") => UserCommand::Stop,
            Some("q" | "quit" | "exit") => UserCommand::Quit,
            Some("p" | "play") => match words.next() {
                None => UserCommand::Play(0),
                Some(n) => match n.parse::<usize>() {
                    Ok(n) if n >= 1 => UserCommand::Play(n - 1),
                    _ => return Err(format!("'{}' is not a chunk number", n)),
                },
            },
            Some(other) => return Err(format!("unknown command '{}'", other)),
            None => return Err("empty command".to_string()),
        };
        match words.next() {
            Some(extra) => Err(format!("unexpected '{}'", extra)),
            None => Ok(command),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub poll_interval: Duration,
    /// Start the first clip as soon as it is discovered.
    pub autostart: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            autostart: false,
        }
    }
}

/// Reads commands from stdin on its own thread until stdin closes.
///
/// A blocking std thread keeps the runtime from waiting on a pending read at
/// shutdown.
pub fn spawn_stdin_commands() -> mpsc::Receiver<UserCommand> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || read_commands(std::io::stdin().lock(), tx));
    rx
}

/// Forwards every valid command line from `reader`, skipping the rest.
pub fn read_commands<R: BufRead>(reader: R, tx: mpsc::Sender<UserCommand>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read command: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<UserCommand>() {
            Ok(command) => {
                if tx.blocking_send(command).is_err() {
                    break;
                }
            }
            Err(e) => warn!("{} ({})", e, COMMAND_HELP),
        }
    }
    debug!("Command input closed");
}

/// Drives the controller until the user quits, or generation is done and
/// there is nothing left to play.
///
/// Discovery ticks, playback events and commands are handled one at a time
/// on the calling task.
pub async fn run_session<S: PlaybackSurface>(
    controller: &mut PlaybackController,
    surface: &mut S,
    mut events: mpsc::UnboundedReceiver<PlaybackEvent>,
    mut commands: mpsc::Receiver<UserCommand>,
    generation_done: watch::Receiver<bool>,
    options: SessionOptions,
) -> anyhow::Result<()> {
    let mut ticker =
        tokio::time::interval_at(Instant::now() + options.poll_interval, options.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut session = Session {
        commands_open: true,
        autostart: options.autostart,
    };
    info!("Playback ready, {}", COMMAND_HELP);

    // First discovery happens before any queued event or command is handled.
    if !session.tick(controller, surface, &events, &generation_done)? {
        loop {
            tokio::select! {
                biased;

                Some(event) = events.recv() => handle_event(controller, surface, event)?,
                _ = ticker.tick() => {
                    if session.tick(controller, surface, &events, &generation_done)? {
                        break;
                    }
                }
                command = commands.recv(), if session.commands_open => match command {
                    Some(UserCommand::Quit) => break,
                    Some(command) => apply_command(controller, surface, command)?,
                    None => session.commands_open = false,
                },
                _ = &mut ctrl_c => {
                    info!("Interrupted");
                    break;
                }
            }
        }
    }

    for index in 0..controller.element_count() {
        surface.stop(index);
    }
    Ok(())
}

struct Session {
    commands_open: bool,
    autostart: bool,
}

impl Session {
    /// One Discover tick. Returns true when the session has nothing left to do.
    fn tick<S: PlaybackSurface>(
        &mut self,
        controller: &mut PlaybackController,
        surface: &mut S,
        events: &mpsc::UnboundedReceiver<PlaybackEvent>,
        generation_done: &watch::Receiver<bool>,
    ) -> anyhow::Result<bool> {
        // Read before scanning: once done, every clip is already on the surface.
        let done = *generation_done.borrow();
        let elements = controller.discover(surface)?;
        if self.autostart && elements > 0 {
            self.autostart = false;
            surface.play(0)?;
        }
        if !done {
            return Ok(false);
        }
        if elements == 0 {
            debug!("No clips were rendered");
            return Ok(true);
        }
        let idle = !(0..elements).any(|i| surface.is_playing(i));
        let finished = !self.commands_open && idle && events.is_empty();
        if finished {
            debug!("Nothing left to play");
        }
        Ok(finished)
    }
}

fn handle_event<S: PlaybackSurface>(
    controller: &mut PlaybackController,
    surface: &mut S,
    event: PlaybackEvent,
) -> anyhow::Result<()> {
    match event {
        PlaybackEvent::Finished(index) => {
            surface.mark_stopped(index);
            controller.handle_finished(index, surface)?;
        }
        PlaybackEvent::Stopped(index) => surface.mark_stopped(index),
        PlaybackEvent::Failed(index, message) => {
            surface.mark_stopped(index);
            error!("Playback of clip {} failed: {}", index + 1, message);
        }
    }
    Ok(())
}

fn apply_command<S: PlaybackSurface>(
    controller: &mut PlaybackController,
    surface: &mut S,
    command: UserCommand,
) -> anyhow::Result<()> {
    match command {
        UserCommand::Toggle => {
            controller.toggle(surface);
        }
        UserCommand::Play(index) => {
            if index < controller.element_count() && surface.controls_enabled(index) {
                surface.play(index)?;
            } else {
                warn!("Clip {} is not available yet", index + 1);
            }
        }
        UserCommand::Stop => {
            for index in 0..controller.element_count() {
                surface.stop(index);
            }
        }
        UserCommand::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::testing::FakeSurface;
    use crate::playback::AutoplayState;

    fn options() -> SessionOptions {
        SessionOptions {
            poll_interval: Duration::from_millis(10),
            autostart: true,
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!("t".parse::<UserCommand>(), Ok(UserCommand::Toggle));
        assert_eq!(" toggle ".parse::<UserCommand>(), Ok(UserCommand::Toggle));
        assert_eq!("p".parse::<UserCommand>(), Ok(UserCommand::Play(0)));
        assert_eq!("play 3".parse::<UserCommand>(), Ok(UserCommand::Play(2)));
        assert_eq!("s".parse::<UserCommand>(), Ok(UserCommand::Stop));
        assert_eq!("quit".parse::<UserCommand>(), Ok(UserCommand::Quit));
        assert!("play 0".parse::<UserCommand>().is_err());
        assert!("play x".parse::<UserCommand>().is_err());
        assert!("t now".parse::<UserCommand>().is_err());
        assert!("dance".parse::<UserCommand>().is_err());
    }

    #[test]
    fn reader_forwards_valid_commands_only() {
        let (tx, mut rx) = mpsc::channel(8);
        read_commands(std::io::Cursor::new("t\nbogus\n\n  p 2\nq\n"), tx);

        assert_eq!(rx.try_recv(), Ok(UserCommand::Toggle));
        assert_eq!(rx.try_recv(), Ok(UserCommand::Play(1)));
        assert_eq!(rx.try_recv(), Ok(UserCommand::Quit));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reader_stops_once_the_session_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        read_commands(std::io::Cursor::new("t\nt\nt\n"), tx);
    }

    #[tokio::test(start_paused = true)]
    async fn chains_every_clip_then_exits() {
        let mut controller = PlaybackController::default();
        let mut surface = FakeSurface::with_elements(3);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        for index in 0..3 {
            event_tx.send(PlaybackEvent::Finished(index)).unwrap();
        }
        let (_, command_rx) = mpsc::channel(1);
        let (_done_tx, done_rx) = watch::channel(true);

        run_session(&mut controller, &mut surface, event_rx, command_rx, done_rx, options())
            .await
            .unwrap();

        assert_eq!(surface.played, vec![0, 1, 2]);
        assert_eq!(surface.installed.len(), 1);
        assert_eq!(controller.current_index(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_clip_does_not_chain() {
        let mut controller = PlaybackController::default();
        let mut surface = FakeSurface::with_elements(2);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        event_tx
            .send(PlaybackEvent::Failed(0, "no such player".into()))
            .unwrap();
        let (_, command_rx) = mpsc::channel(1);
        let (_done_tx, done_rx) = watch::channel(true);

        run_session(&mut controller, &mut surface, event_rx, command_rx, done_rx, options())
            .await
            .unwrap();

        assert_eq!(surface.played, vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_see_discovered_clips() {
        let mut controller = PlaybackController::default();
        let mut surface = FakeSurface::with_elements(2);
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(4);
        command_tx.send(UserCommand::Toggle).await.unwrap();
        command_tx.send(UserCommand::Play(1)).await.unwrap();
        command_tx.send(UserCommand::Quit).await.unwrap();
        let (_done_tx, done_rx) = watch::channel(false);

        run_session(
            &mut controller,
            &mut surface,
            event_rx,
            command_rx,
            done_rx,
            SessionOptions {
                autostart: false,
                ..options()
            },
        )
        .await
        .unwrap();

        assert_eq!(controller.autoplay(), AutoplayState { enabled: false });
        assert_eq!(surface.installed.len(), 1);
        assert_eq!(surface.updates.len(), 1);
        // Any discovered clip can be started by hand; quitting stops it.
        assert_eq!(surface.played, vec![1]);
        assert!(surface.playing.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_event_queued_at_a_due_tick_still_chains() {
        let mut controller = PlaybackController::default();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        // Clips appear on the second scan and finish as soon as they start.
        let mut surface = FakeSurface {
            scan_results: [0, 2].into(),
            finish_on_play: Some(event_tx),
            ..FakeSurface::default()
        };
        let (_, command_rx) = mpsc::channel(1);
        let (done_tx, done_rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let _ = done_tx.send(true);
        });

        run_session(&mut controller, &mut surface, event_rx, command_rx, done_rx, options())
            .await
            .unwrap();

        assert_eq!(surface.played, vec![0, 1]);
        assert_eq!(controller.current_index(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn exits_when_generation_rendered_nothing() {
        let mut controller = PlaybackController::default();
        let mut surface = FakeSurface::default();
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let (_command_tx, command_rx) = mpsc::channel(1);
        let (_done_tx, done_rx) = watch::channel(true);

        run_session(&mut controller, &mut surface, event_rx, command_rx, done_rx, options())
            .await
            .unwrap();

        assert!(surface.installed.is_empty());
        assert_eq!(surface.scans, 1);
    }
}
