//! Wire format shared by the remote notification transports.

use serde::{Deserialize, Serialize};

use super::Event;

/// `{"Type": "<event type>", "Msg": "<rendered payload>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Msg")]
    pub msg: String,
}

impl WireMessage {
    pub fn from_event(event: &Event) -> Self {
        Self {
            kind: event.kind().as_str().to_string(),
            msg: event.render_payload(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// JSON followed by the `\n` frame delimiter used by the socket transport.
    pub fn to_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
