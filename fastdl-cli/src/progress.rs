//! Terminal progress display driven by engine events.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fastdl::event::{Event, MessageLevel};
use fastdl::notify::CallbackSink;
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{prefix:>7} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// One progress bar per file, replaced on every `startOne`.
#[derive(Default)]
pub struct ProgressDisplay {
    bar: Mutex<Option<ProgressBar>>,
}

impl fmt::Debug for ProgressDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressDisplay")
            .field("position", &self.position())
            .finish()
    }
}

impl ProgressDisplay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A sink that forwards every event to `display`.
    pub fn sink(display: &Arc<Self>) -> CallbackSink {
        let display = Arc::clone(display);
        CallbackSink::new(move |event: &Event| display.handle(event))
    }

    pub fn handle(&self, event: &Event) {
        let Ok(mut bar) = self.bar.lock() else {
            return;
        };
        match event {
            Event::StartOne(file) => {
                let pb = ProgressBar::new(0);
                pb.set_style(bar_style());
                pb.set_prefix(format!("{}/{}", file.index, file.total));
                pb.enable_steady_tick(Duration::from_millis(200));
                pb.println(format!("Downloading {}", file.url));
                *bar = Some(pb);
            }
            Event::Update(update) => {
                if let Some(pb) = bar.as_ref() {
                    if pb.length() != Some(update.total) {
                        pb.set_length(update.total);
                    }
                    pb.inc(update.added);
                }
            }
            Event::EndOne(_) => {
                if let Some(pb) = bar.take() {
                    pb.finish();
                }
            }
            Event::Msg(message) => {
                let line = match message.level {
                    MessageLevel::Info => message.text.clone(),
                    MessageLevel::Warning => format!("warning: {}", message.text),
                    MessageLevel::Error => format!("error: {}", message.text),
                };
                match bar.as_ref() {
                    Some(pb) => pb.println(line),
                    None => eprintln!("{}", line),
                }
            }
            Event::Start | Event::End => {}
        }
    }

    /// Stop the current bar, leaving it on screen.
    pub fn abandon(&self) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(pb) = bar.take() {
                pb.abandon();
            }
        }
    }

    /// Bytes shown on the current bar.
    pub fn position(&self) -> Option<u64> {
        self.bar
            .lock()
            .ok()
            .and_then(|bar| bar.as_ref().map(ProgressBar::position))
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}
