//! Render sinks
//!
//! The host label the animator draws into. The animator never lays out or
//! paints text itself; it only pushes whatever the presentation pipeline
//! produced for the current tick.

use std::sync::{Mutex, PoisonError};
use tally_core::{Color, RichText};

/// The host label
///
/// Implementations are called from whichever thread drives the tick
/// scheduler, never with an animator lock held.
pub trait LabelSink: Send + Sync {
    /// Replace the label's plain text
    fn set_text(&self, text: &str);

    /// Replace the label's text with styled text
    ///
    /// Hosts without rich text support get the plain text.
    fn set_rich_text(&self, text: &RichText) {
        self.set_text(&text.plain_text());
    }

    /// Replace the label's foreground color
    fn set_color(&self, _color: Color) {}
}

/// One call received by a [`RecordingSink`]
#[derive(Clone, Debug, PartialEq)]
pub enum SinkEvent {
    Text(String),
    Rich(RichText),
    Color(Color),
}

/// A sink that records every call, in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: SinkEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// All recorded events
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Text of every `set_text` and `set_rich_text` call
    pub fn texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Text(text) => Some(text),
                SinkEvent::Rich(rich) => Some(rich.plain_text()),
                SinkEvent::Color(_) => None,
            })
            .collect()
    }

    pub fn colors(&self) -> Vec<Color> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Color(color) => Some(color),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }

    pub fn last_color(&self) -> Option<Color> {
        self.colors().pop()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LabelSink for RecordingSink {
    fn set_text(&self, text: &str) {
        self.record(SinkEvent::Text(text.to_string()));
    }

    fn set_rich_text(&self, text: &RichText) {
        self.record(SinkEvent::Rich(text.clone()));
    }

    fn set_color(&self, color: Color) {
        self.record(SinkEvent::Color(color));
    }
}
