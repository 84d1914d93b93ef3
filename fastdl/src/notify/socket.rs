//! TCP socket sink.
//!
//! Each event is written as a [`WireMessage`] JSON object followed by `\n`
//! over one persistent connection.

use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{NotificationSink, NotifyError, CONNECT_TIMEOUT, WRITE_TIMEOUT};
use crate::event::{Event, WireMessage};

/// Newline-delimited JSON over TCP.
#[derive(Debug)]
pub struct SocketSink {
    endpoint: String,
    stream: Mutex<Option<TcpStream>>,
}

impl SocketSink {
    /// Connect to `host:port`.
    pub fn connect(endpoint: &str) -> Result<Self, NotifyError> {
        let addrs = endpoint
            .to_socket_addrs()
            .map_err(|_| NotifyError::InvalidEndpoint(endpoint.to_string()))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    stream
                        .set_write_timeout(Some(WRITE_TIMEOUT))
                        .and_then(|_| stream.set_nodelay(true))
                        .map_err(|e| NotifyError::Connect {
                            endpoint: endpoint.to_string(),
                            source: e,
                        })?;
                    debug!(endpoint, "Socket sink connected");
                    return Ok(Self {
                        endpoint: endpoint.to_string(),
                        stream: Mutex::new(Some(stream)),
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }

        match last_err {
            Some(source) => Err(NotifyError::Connect {
                endpoint: endpoint.to_string(),
                source,
            }),
            None => Err(NotifyError::InvalidEndpoint(endpoint.to_string())),
        }
    }

    /// Close the connection. Later events are dropped.
    pub fn close(&self) {
        if let Some(stream) = self.stream.lock().take() {
            stream.shutdown(Shutdown::Both).ok();
        }
    }
}

impl NotificationSink for SocketSink {
    fn notify(&self, event: &Event) {
        let mut guard = self.stream.lock();
        let Some(stream) = guard.as_mut() else {
            return;
        };

        let line = match WireMessage::from_event(event).to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize event");
                return;
            }
        };

        if let Err(e) = stream.write_all(&line) {
            warn!(endpoint = %self.endpoint, error = %e, "Socket sink disconnected");
            *guard = None;
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.lock().is_some()
    }
}

impl Drop for SocketSink {
    fn drop(&mut self) {
        self.close();
    }
}
