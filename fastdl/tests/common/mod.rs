//! Shared fixtures for the integration tests.
//!
//! [`FileServer`] serves in-memory files over HTTP on a background tokio
//! runtime. The engine uses a blocking client, so tests themselves are plain
//! `#[test]` functions.
//!
//! Routes:
//! - `/range/{name}`: honours `Range` with 206 and `Content-Range`
//! - `/full/{name}`: ignores `Range` and always answers 200 with the whole body
//! - `/slow/{name}`: like `/range`, but streams 4 KiB every 5 ms
//! - anything else: 404

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::StreamExt;
use parking_lot::Mutex;
use rand::Rng;

use fastdl::event::Event;
use fastdl::notify::{CallbackSink, Notifier};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Range,
    Full,
    Slow,
}

#[derive(Default)]
struct ServerState {
    files: HashMap<String, Vec<u8>>,
    /// Number of HEAD and GET requests per file name.
    hits: Mutex<HashMap<String, usize>>,
}

/// HTTP file server bound to an ephemeral localhost port.
pub struct FileServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl FileServer {
    /// Serve `files` (name, content).
    pub fn start(files: Vec<(&str, Vec<u8>)>) -> Self {
        let state = Arc::new(ServerState {
            files: files
                .into_iter()
                .map(|(name, data)| (name.to_string(), data))
                .collect(),
            hits: Mutex::new(HashMap::new()),
        });

        let app = Router::new()
            .route("/range/:name", get(get_range).head(head))
            .route("/full/:name", get(get_full).head(head))
            .route("/slow/:name", get(get_slow).head(head))
            .with_state(Arc::clone(&state));

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        let addr = rx.recv().unwrap();
        Self { addr, state }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Requests received for `name` on any route.
    pub fn hits(&self, name: &str) -> usize {
        self.state.hits.lock().get(name).copied().unwrap_or(0)
    }
}

fn record_hit(state: &ServerState, name: &str) {
    *state.hits.lock().entry(name.to_string()).or_insert(0) += 1;
}

async fn head(State(state): State<Arc<ServerState>>, Path(name): Path<String>) -> Response {
    record_hit(&state, &name);
    match state.files.get(&name) {
        Some(data) => (
            StatusCode::OK,
            [
                (header::CONTENT_LENGTH, data.len().to_string()),
                (header::ACCEPT_RANGES, "bytes".to_string()),
            ],
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn get_range(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    serve(&state, &name, &headers, Mode::Range)
}

async fn get_full(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    serve(&state, &name, &headers, Mode::Full)
}

async fn get_slow(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    serve(&state, &name, &headers, Mode::Slow)
}

fn serve(state: &ServerState, name: &str, headers: &HeaderMap, mode: Mode) -> Response {
    record_hit(state, name);
    let Some(data) = state.files.get(name) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if mode == Mode::Full {
        return (StatusCode::OK, data.clone()).into_response();
    }

    let Some((start, end)) = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_range(v, data.len()))
    else {
        return (StatusCode::OK, data.clone()).into_response();
    };

    let slice = data[start..=end].to_vec();
    let content_range = format!("bytes {}-{}/{}", start, end, data.len());
    let body = if mode == Mode::Slow {
        let pieces: Vec<Vec<u8>> = slice.chunks(4096).map(|c| c.to_vec()).collect();
        let stream = futures_util::stream::iter(pieces).then(|piece| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, std::io::Error>(piece)
        });
        Body::from_stream(stream)
    } else {
        Body::from(slice)
    };

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_RANGE, content_range)
        .header(header::CONTENT_LENGTH, end - start + 1)
        .body(body)
        .unwrap()
}

/// Parse `bytes=start-end` against a body of `len` bytes.
fn parse_range(value: &str, len: usize) -> Option<(usize, usize)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    let start: usize = start.trim().parse().ok()?;
    let end: usize = end.trim().parse().ok()?;
    if start > end || start >= len {
        return None;
    }
    Some((start, end.min(len - 1)))
}

/// `len` random bytes.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::rng().fill(&mut data[..]);
    data
}

/// Notifier that records every event.
pub fn recorder() -> (Notifier, Arc<Mutex<Vec<Event>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = Arc::clone(&events);
    let notifier = Notifier::new().with_sink(CallbackSink::new(move |e: &Event| {
        events_clone.lock().push(e.clone())
    }));
    (notifier, events)
}

/// Lifecycle events rendered as `start`, `startOne 1/3`, ...
pub fn lifecycle(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Start => Some("start".to_string()),
            Event::StartOne(f) => Some(format!("startOne {}/{}", f.index, f.total)),
            Event::EndOne(f) => Some(format!("endOne {}/{}", f.index, f.total)),
            Event::End => Some("end".to_string()),
            _ => None,
        })
        .collect()
}

/// Sum of `added` over all update events.
pub fn added_sum(events: &[Event]) -> u64 {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Update(u) => Some(u.added),
            _ => None,
        })
        .sum()
}
