//! WebSocket sink.
//!
//! Connects to `<endpoint>/websocket` and sends each event as a single
//! [`WireMessage`] text frame.

use std::net::{TcpStream, ToSocketAddrs};

use parking_lot::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::stream::MaybeTlsStream;
use tokio_tungstenite::tungstenite::{self, Message, WebSocket};
use tracing::{debug, warn};

use super::{NotificationSink, NotifyError, CONNECT_TIMEOUT, WRITE_TIMEOUT};
use crate::event::{Event, WireMessage};

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Build the WebSocket URL for a notification endpoint.
///
/// `http` becomes `ws` (and `https` becomes `wss`); endpoints without a
/// scheme are treated as plain `ws`. `/websocket` is appended.
pub fn websocket_url(endpoint: &str) -> String {
    let mut url = if let Some(rest) = endpoint.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = endpoint.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        endpoint.to_string()
    } else {
        format!("ws://{}", endpoint)
    };
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str("websocket");
    url
}

/// One text frame per event over a WebSocket connection.
pub struct WebSocketSink {
    url: String,
    socket: Mutex<Option<Socket>>,
}

impl std::fmt::Debug for WebSocketSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketSink")
            .field("url", &self.url)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl WebSocketSink {
    /// Connect to the WebSocket route of `endpoint`.
    pub fn connect(endpoint: &str) -> Result<Self, NotifyError> {
        let url = websocket_url(endpoint);
        let request = url
            .as_str()
            .into_client_request()
            .map_err(|_| NotifyError::InvalidEndpoint(url.clone()))?;

        let uri = request.uri();
        let host = uri
            .host()
            .ok_or_else(|| NotifyError::InvalidEndpoint(url.clone()))?
            .to_string();
        let default_port = if uri.scheme_str() == Some("wss") { 443 } else { 80 };
        let port = uri.port_u16().unwrap_or(default_port);

        let stream = connect_tcp(&host, port).map_err(|source| NotifyError::Connect {
            endpoint: url.clone(),
            source,
        })?;

        let (socket, _response) = tungstenite::client_tls_with_config(request, stream, None, None)
            .map_err(|e| NotifyError::Handshake {
                endpoint: url.clone(),
                reason: e.to_string(),
            })?;

        debug!(url = %url, "WebSocket sink connected");
        Ok(Self {
            url,
            socket: Mutex::new(Some(socket)),
        })
    }

    /// Close the connection. Later events are dropped.
    pub fn close(&self) {
        if let Some(mut socket) = self.socket.lock().take() {
            socket.close(None).ok();
            socket.flush().ok();
        }
    }
}

fn connect_tcp(host: &str, port: u16) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                // Bounds the handshake as well as later writes.
                stream.set_read_timeout(Some(CONNECT_TIMEOUT))?;
                stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved")
    }))
}

impl NotificationSink for WebSocketSink {
    fn notify(&self, event: &Event) {
        let mut guard = self.socket.lock();
        let Some(socket) = guard.as_mut() else {
            return;
        };

        let json = match WireMessage::from_event(event).to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize event");
                return;
            }
        };

        if let Err(e) = socket.send(Message::text(json)) {
            warn!(url = %self.url, error = %e, "WebSocket sink disconnected");
            *guard = None;
        }
    }

    fn is_connected(&self) -> bool {
        self.socket.lock().is_some()
    }
}

impl Drop for WebSocketSink {
    fn drop(&mut self) {
        self.close();
    }
}
