use clap::Parser;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use tts_chunker::args::Args;
use tts_chunker::playback::session::spawn_stdin_commands;
use tts_chunker::playback::{
    AutoplayState, ClipPlayer, PlaybackController, PlayerCommand, SessionOptions, run_session,
};
use tts_chunker::{
    DirectorySurface, GenerateRequest, Orchestrator, RunSummary, SpeechClient, ValidationError,
    VoiceSelection,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting text-to-speech chunker");

    let args = Args::parse();
    let text = args.read_text()?;
    let request = GenerateRequest {
        api_key: args.api_key.clone(),
        text,
        chunk_size: args.chunk_size as usize,
    };

    let surface = DirectorySurface::create(&args.out)?;
    let client = SpeechClient::new(
        args.endpoint.clone(),
        VoiceSelection {
            model: args.model.clone(),
            voice: args.voice.clone(),
        },
    );
    let mut orchestrator = Orchestrator::new(client, surface);

    if args.no_play {
        return report(orchestrator.generate(&request).await);
    }

    let player_command = PlayerCommand::parse(&args.player)?;
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = watch::channel(false);
    let mut options = SessionOptions {
        poll_interval: Duration::from_millis(args.poll_ms.max(1)),
        autostart: args.autostart,
    };
    let commands = if args.text_from_stdin() {
        if !options.autostart {
            info!("Text was read from stdin; starting playback automatically");
            options.autostart = true;
        }
        // Closed immediately: no command source.
        mpsc::channel(1).1
    } else {
        spawn_stdin_commands()
    };

    let mut player = ClipPlayer::new(&args.out, player_command, event_tx);
    let mut controller = PlaybackController::new(AutoplayState::default());

    let generation = async {
        let outcome = orchestrator.generate(&request).await;
        let _ = done_tx.send(true);
        outcome
    };
    let session = run_session(
        &mut controller,
        &mut player,
        event_rx,
        commands,
        done_rx,
        options,
    );

    let (generated, played) = tokio::join!(generation, session);
    if let Err(e) = played {
        error!("Playback stopped: {:#}", e);
    }
    report(generated)
}

fn report(outcome: Result<RunSummary, ValidationError>) -> anyhow::Result<()> {
    match outcome {
        Ok(summary) => {
            debug!("{} of {} chunks rendered", summary.rendered, summary.chunks);
            info!("Process complete.");
            Ok(())
        }
        Err(e) => {
            debug!("Run rejected: {:?}", e);
            std::process::exit(2);
        }
    }
}
