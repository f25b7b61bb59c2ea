#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use warp::Filter;
use warp::http::StatusCode;

/// Authorization header and JSON body of one received request.
pub type Seen = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

pub struct MockTts {
    pub endpoint: String,
    pub seen: Seen,
    shutdown: mpsc::Sender<()>,
}

impl MockTts {
    pub async fn stop(self) {
        let _ = self.shutdown.send(()).await;
    }
}

/// Serves `POST /openai/v1/audio/speech`, answering every request with
/// `status` and `body`.
pub async fn spawn_mock_tts(status: u16, body: &'static [u8]) -> MockTts {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let status = StatusCode::from_u16(status).unwrap();

    let route = warp::post()
        .and(warp::path!("openai" / "v1" / "audio" / "speech"))
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::json())
        .map(move |auth: Option<String>, request: serde_json::Value| {
            recorder.lock().unwrap().push((auth, request));
            warp::reply::with_status(body.to_vec(), status)
        });

    let (addr, server) =
        warp::serve(route).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
            shutdown_rx.recv().await;
        });
    tokio::spawn(server);
    MockTts {
        endpoint: format!("http://{}/openai/v1/audio/speech", addr),
        seen,
        shutdown: shutdown_tx,
    }
}
