//! Presentation pipeline
//!
//! Turns the current numeric value into what the host label shows: plain
//! text, rich text, and optionally a blended foreground color.
//!
//! Rule precedence: string formatter, then rich-text formatter, then the
//! printf-style number format.

use crate::sink::LabelSink;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tally_core::{Color, NumberFormat, Result, RichText, TallyError};

/// Custom plain-text formatter
pub type StringFormatter = Arc<dyn Fn(f64) -> String + Send + Sync>;

/// Custom rich-text formatter
pub type RichTextFormatter = Arc<dyn Fn(f64) -> RichText + Send + Sync>;

/// Run a host callback, turning a panic into `None`
pub(crate) fn isolate<T>(what: &str, f: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("{} panicked; ignoring its result", what);
            None
        }
    }
}

/// The rule that renders a value, after precedence is applied
#[derive(Clone, Copy)]
pub enum PresentationRule<'a> {
    Text(&'a StringFormatter),
    Rich(&'a RichTextFormatter),
    Format(&'a NumberFormat),
}

impl PresentationRule<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            PresentationRule::Text(_) => "string formatter",
            PresentationRule::Rich(_) => "rich-text formatter",
            PresentationRule::Format(_) => "number format",
        }
    }
}

/// Rendered label content
#[derive(Clone, Debug, PartialEq)]
pub enum Presentation {
    Text(String),
    Rich(RichText),
}

impl Presentation {
    pub fn plain_text(&self) -> String {
        match self {
            Presentation::Text(text) => text.clone(),
            Presentation::Rich(rich) => rich.plain_text(),
        }
    }

    pub fn apply(&self, sink: &dyn LabelSink) {
        match self {
            Presentation::Text(text) => sink.set_text(text),
            Presentation::Rich(rich) => sink.set_rich_text(rich),
        }
    }
}

/// Formatting configuration of a label
#[derive(Clone, Default)]
pub struct Presenter {
    format: Arc<NumberFormat>,
    string_formatter: Option<StringFormatter>,
    rich_formatter: Option<RichTextFormatter>,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(&self) -> &NumberFormat {
        &self.format
    }

    pub fn set_format(&mut self, format: NumberFormat) {
        self.format = Arc::new(format);
    }

    pub fn set_string_formatter(&mut self, formatter: Option<StringFormatter>) {
        self.string_formatter = formatter;
    }

    pub fn set_rich_formatter(&mut self, formatter: Option<RichTextFormatter>) {
        self.rich_formatter = formatter;
    }

    /// The rule that currently drives rendering
    pub fn rule(&self) -> PresentationRule<'_> {
        if let Some(ref formatter) = self.string_formatter {
            PresentationRule::Text(formatter)
        } else if let Some(ref formatter) = self.rich_formatter {
            PresentationRule::Rich(formatter)
        } else {
            PresentationRule::Format(&self.format)
        }
    }

    /// Render a value with the active rule
    ///
    /// Non-finite values and panicking formatters are reported as errors so
    /// the caller can keep the label's previous text.
    pub fn present(&self, value: f64) -> Result<Presentation> {
        if !value.is_finite() {
            return Err(TallyError::Unrenderable {
                value,
                reason: "value is not a real number (check the easing rate)".to_string(),
            });
        }

        let rule = self.rule();
        let panicked = || TallyError::InvalidConfig(format!("{} panicked", rule.name()));
        match rule {
            PresentationRule::Text(formatter) => isolate(rule.name(), || formatter(value))
                .map(Presentation::Text)
                .ok_or_else(panicked),
            PresentationRule::Rich(formatter) => isolate(rule.name(), || formatter(value))
                .map(Presentation::Rich)
                .ok_or_else(panicked),
            PresentationRule::Format(format) => format.render(value).map(Presentation::Text),
        }
    }
}

impl std::fmt::Debug for Presenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presenter")
            .field("format", &self.format.as_str())
            .field("string_formatter", &self.string_formatter.is_some())
            .field("rich_formatter", &self.rich_formatter.is_some())
            .finish()
    }
}

/// Foreground color blended over a run
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorTransition {
    pub start: Color,
    pub end: Color,
}

impl ColorTransition {
    pub fn new(start: Color, end: Color) -> Self {
        Self { start, end }
    }

    /// Color at a raw (un-eased) time fraction
    pub fn at(&self, fraction: f64) -> Color {
        Color::lerp(&self.start, &self.end, fraction as f32)
    }
}

/// Everything needed to push one frame to the sink, captured under the
/// animator lock and rendered after it is released
pub(crate) struct Frame {
    pub value: f64,
    pub fraction: f64,
    pub presenter: Presenter,
    pub colors: Option<ColorTransition>,
    pub sink: Option<Arc<dyn LabelSink>>,
}

impl Frame {
    pub fn render(self) {
        let Some(sink) = self.sink else { return };

        match self.presenter.present(self.value) {
            Ok(presentation) => {
                tracing::trace!(value = self.value, "label frame");
                presentation.apply(sink.as_ref());
            }
            Err(err) => tracing::warn!("keeping previous label text: {}", err),
        }

        if let Some(colors) = self.colors {
            sink.set_color(colors.at(self.fraction));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{RecordingSink, SinkEvent};
    use tally_core::SpanStyle;

    #[test]
    fn test_default_rule_is_number_format() {
        let presenter = Presenter::new();
        assert!(matches!(presenter.rule(), PresentationRule::Format(_)));
        assert_eq!(
            presenter.present(41.7).unwrap(),
            Presentation::Text("41".to_string())
        );
    }

    #[test]
    fn test_string_formatter_wins_over_rich() {
        let mut presenter = Presenter::new();
        presenter.set_rich_formatter(Some(Arc::new(|v: f64| RichText::from(format!("rich {v}")))));
        assert!(matches!(presenter.rule(), PresentationRule::Rich(_)));

        presenter.set_string_formatter(Some(Arc::new(|v: f64| format!("text {}", v as i64))));
        assert!(matches!(presenter.rule(), PresentationRule::Text(_)));
        assert_eq!(
            presenter.present(3.9).unwrap(),
            Presentation::Text("text 3".to_string())
        );

        presenter.set_string_formatter(None);
        assert_eq!(
            presenter.present(2.0).unwrap().plain_text(),
            "rich 2".to_string()
        );
    }

    #[test]
    fn test_float_format() {
        let mut presenter = Presenter::new();
        presenter.set_format(NumberFormat::parse("%f").unwrap());
        assert_eq!(presenter.present(50.25).unwrap().plain_text(), "50.250000");
    }

    #[test]
    fn test_non_finite_value_is_an_error() {
        let presenter = Presenter::new();
        assert!(presenter.present(f64::NAN).is_err());
        assert!(presenter.present(f64::INFINITY).is_err());
    }

    #[test]
    fn test_panicking_formatter_is_isolated() {
        let mut presenter = Presenter::new();
        presenter.set_string_formatter(Some(Arc::new(|_: f64| -> String { panic!("formatter bug") })));
        assert!(matches!(
            presenter.present(1.0),
            Err(TallyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_color_transition_uses_raw_fraction() {
        let transition = ColorTransition::new(Color::BLACK, Color::GREEN);
        let mid = transition.at(0.5);
        assert!((mid.g - 0.5).abs() < 1e-6);
        assert_eq!(transition.at(0.0), Color::BLACK);
        assert_eq!(transition.at(1.0), Color::GREEN);
    }

    #[test]
    fn test_frame_keeps_previous_text_on_error() {
        let sink = Arc::new(RecordingSink::new());
        let frame = Frame {
            value: f64::NAN,
            fraction: 0.5,
            presenter: Presenter::new(),
            colors: Some(ColorTransition::new(Color::BLACK, Color::WHITE)),
            sink: Some(sink.clone()),
        };
        frame.render();

        // No text, but the color still moves
        assert_eq!(sink.texts(), Vec::<String>::new());
        assert_eq!(sink.colors().len(), 1);
    }

    #[test]
    fn test_frame_pushes_rich_text() {
        let sink = Arc::new(RecordingSink::new());
        let mut presenter = Presenter::new();
        presenter.set_rich_formatter(Some(Arc::new(|v: f64| {
            RichText::styled(format!("{}", v as i64), SpanStyle::bold())
        })));

        Frame {
            value: 12.0,
            fraction: 1.0,
            presenter,
            colors: None,
            sink: Some(sink.clone()),
        }
        .render();

        assert_eq!(
            sink.events(),
            vec![SinkEvent::Rich(RichText::styled("12", SpanStyle::bold()))]
        );
    }
}
