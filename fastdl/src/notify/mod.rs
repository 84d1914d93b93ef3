//! Notification sinks for engine events.
//!
//! The engine publishes every [`Event`] through a [`Notifier`], which fans it
//! out to zero or more [`NotificationSink`]s:
//!
//! - [`CallbackSink`]: in-process closure
//! - [`SocketSink`]: newline-delimited JSON over TCP
//! - [`WebSocketSink`]: one JSON text frame per event
//!
//! Sinks never fail the download. A remote sink that cannot deliver an event
//! marks itself disconnected and drops later events.

mod callback;
mod socket;
mod websocket;

pub use callback::CallbackSink;
pub use socket::SocketSink;
pub use websocket::{websocket_url, WebSocketSink};

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::config::{NotifyConfig, Transport};
use crate::event::Event;

/// Timeout for establishing a remote sink connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for a single write to a remote sink.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while connecting a remote sink.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("WebSocket handshake with {endpoint} failed: {reason}")]
    Handshake { endpoint: String, reason: String },
}

/// Consumer of engine events.
///
/// Implementations are called from worker threads and must not block
/// indefinitely.
pub trait NotificationSink: Send + Sync {
    /// Deliver one event. Delivery failures are handled by the sink.
    fn notify(&self, event: &Event);

    /// Whether the sink can still deliver events.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Fan-out over all registered sinks.
#[derive(Clone, Default)]
pub struct Notifier {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Notifier {
    /// Create a notifier with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn with_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Add a shared sink.
    pub fn add_sink(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    /// Connect the remote sink described by `config`.
    ///
    /// A connection failure is logged and the notifier is returned unchanged.
    pub fn with_remote(mut self, config: &NotifyConfig) -> Self {
        let connected: Result<Arc<dyn NotificationSink>, NotifyError> = match config.transport {
            Transport::Socket => SocketSink::connect(&config.endpoint)
                .map(|s| Arc::new(s) as Arc<dyn NotificationSink>),
            Transport::WebSocket => WebSocketSink::connect(&config.endpoint)
                .map(|s| Arc::new(s) as Arc<dyn NotificationSink>),
        };

        match connected {
            Ok(sink) => self.sinks.push(sink),
            Err(e) => warn!(
                endpoint = %config.endpoint,
                transport = %config.transport,
                error = %e,
                "Notification endpoint unavailable, continuing without it"
            ),
        }
        self
    }

    /// Number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver `event` to every sink.
    pub fn notify(&self, event: &Event) {
        if self.sinks.is_empty() {
            warn!(
                event = %event.kind(),
                name = event.name(),
                payload = %event.render_payload(),
                "No notification sink registered"
            );
            return;
        }
        for sink in &self.sinks {
            sink.notify(event);
        }
    }
}
