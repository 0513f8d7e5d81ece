//! Rich (attributed) text
//!
//! A `RichText` is an ordered list of spans, each carrying its own style.
//! Hosts decide how to map the style onto their text renderer.

use crate::color::Color;

/// Font weight
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FontWeight {
    Thin,
    Light,
    #[default]
    Regular,
    Medium,
    Bold,
    Black,
}

/// Style attributes of a single span
///
/// `None` fields inherit whatever the host label already uses.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpanStyle {
    /// Font weight
    pub weight: FontWeight,
    /// Font size in points
    pub size: Option<f32>,
    /// Span color
    pub color: Option<Color>,
}

impl SpanStyle {
    pub fn bold() -> Self {
        Self {
            weight: FontWeight::Bold,
            ..Default::default()
        }
    }

    pub fn size(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }
}

/// A run of text sharing one style
#[derive(Clone, Debug, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub style: SpanStyle,
}

/// Styled text made of one or more spans
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RichText {
    spans: Vec<TextSpan>,
}

impl RichText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-span text with the given style
    pub fn styled(text: impl Into<String>, style: SpanStyle) -> Self {
        Self::new().span(text, style)
    }

    /// Append a span (builder pattern)
    pub fn span(mut self, text: impl Into<String>, style: SpanStyle) -> Self {
        self.push(text, style);
        self
    }

    pub fn push(&mut self, text: impl Into<String>, style: SpanStyle) {
        self.spans.push(TextSpan {
            text: text.into(),
            style,
        });
    }

    pub fn spans(&self) -> &[TextSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|s| s.text.is_empty())
    }

    /// The text with all styling dropped
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

impl From<&str> for RichText {
    fn from(text: &str) -> Self {
        Self::styled(text, SpanStyle::default())
    }
}

impl From<String> for RichText {
    fn from(text: String) -> Self {
        Self::styled(text, SpanStyle::default())
    }
}
