//! Lifecycle and progress events.
//!
//! Every event carries exactly the payload its kind needs:
//!
//! | Kind       | Payload                       |
//! |------------|-------------------------------|
//! | `start`    | none                          |
//! | `startOne` | [`FileEvent`] url/index/total |
//! | `update`   | [`ProgressUpdate`]            |
//! | `endOne`   | [`FileEvent`]                 |
//! | `end`      | none                          |
//! | `msg`      | [`Message`] level/text        |
//!
//! Sinks that speak the remote wire protocol use [`WireMessage`].

mod wire;

pub use wire::WireMessage;

use std::fmt;

use serde::Serialize;

/// Event type, with the name used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    StartOne,
    Update,
    End,
    EndOne,
    Msg,
}

impl EventKind {
    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::StartOne => "startOne",
            EventKind::Update => "update",
            EventKind::End => "end",
            EventKind::EndOne => "endOne",
            EventKind::Msg => "msg",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

impl MessageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageLevel::Info => "info",
            MessageLevel::Warning => "warning",
            MessageLevel::Error => "error",
        }
    }
}

/// Identifies a file within the sequence. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileEvent {
    #[serde(rename = "URL")]
    pub url: String,
    pub index: usize,
    pub total: usize,
}

/// Incremental progress for the current file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProgressUpdate {
    /// Size of the current file in bytes.
    pub total: u64,
    /// Bytes written since the previous update.
    pub added: u64,
    /// Average bytes per second since the file started.
    pub speed: f64,
}

/// Free-form notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    #[serde(skip)]
    pub level: MessageLevel,
    pub text: String,
}

/// An engine event together with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    StartOne(FileEvent),
    Update(ProgressUpdate),
    EndOne(FileEvent),
    End,
    Msg(Message),
}

impl Event {
    pub fn info(text: impl Into<String>) -> Self {
        Self::message(MessageLevel::Info, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::message(MessageLevel::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::message(MessageLevel::Error, text)
    }

    fn message(level: MessageLevel, text: impl Into<String>) -> Self {
        Event::Msg(Message {
            level,
            text: text.into(),
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Start => EventKind::Start,
            Event::StartOne(_) => EventKind::StartOne,
            Event::Update(_) => EventKind::Update,
            Event::EndOne(_) => EventKind::EndOne,
            Event::End => EventKind::End,
            Event::Msg(_) => EventKind::Msg,
        }
    }

    /// Human-readable event name.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start => "download started",
            Event::StartOne(_) => "file started",
            Event::Update(_) => "update",
            Event::EndOne(_) => "file finished",
            Event::End => "download finished",
            Event::Msg(m) => m.level.as_str(),
        }
    }

    /// Payload as a JSON object with PascalCase keys.
    ///
    /// Payload-less events serialize to `{}`.
    pub fn payload_json(&self) -> serde_json::Value {
        let value = match self {
            Event::Start | Event::End => Ok(serde_json::Value::Object(Default::default())),
            Event::StartOne(f) | Event::EndOne(f) => serde_json::to_value(f),
            Event::Update(u) => serde_json::to_value(u),
            Event::Msg(m) => serde_json::to_value(m),
        };
        value.unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }

    /// Payload rendered as `map[Key:value ...]` with keys in sorted order.
    pub fn render_payload(&self) -> String {
        let mut fields: Vec<(&str, String)> = match self {
            Event::Start | Event::End => Vec::new(),
            Event::StartOne(f) | Event::EndOne(f) => vec![
                ("URL", f.url.clone()),
                ("Index", f.index.to_string()),
                ("Total", f.total.to_string()),
            ],
            Event::Update(u) => vec![
                ("Total", u.total.to_string()),
                ("Added", u.added.to_string()),
                ("Speed", format_float(u.speed)),
            ],
            Event::Msg(m) => vec![("Text", m.text.clone())],
        };
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let body = fields
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        format!("map[{}]", body)
    }
}

/// Shortest float rendering in exponent form outside `1e-4 <= |v| < 1e6`,
/// with a signed two-digit exponent (`1.2345678e+06`).
fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let scientific = format!("{:e}", value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };
    if (-4..6).contains(&exponent) {
        return value.to_string();
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exponent.abs())
}
