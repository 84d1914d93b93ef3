//! In-process callback sink.

use std::fmt;

use super::NotificationSink;
use crate::event::Event;

/// Delivers events to a closure.
pub struct CallbackSink {
    callback: Box<dyn Fn(&Event) + Send + Sync>,
}

impl CallbackSink {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for CallbackSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSink").finish_non_exhaustive()
    }
}

impl NotificationSink for CallbackSink {
    fn notify(&self, event: &Event) {
        (self.callback)(event);
    }
}
