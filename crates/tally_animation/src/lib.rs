//! Tally Animation
//!
//! The value-animation engine behind counting labels.
//!
//! # Features
//!
//! - **Easing**: linear, ease-in, ease-out and ease-in-out curves with a rate exponent
//! - **Tick Scheduler**: host-driven or background 30 Hz tick source
//! - **Counting Animator**: start/supersede/cancel state machine with completion callbacks
//! - **Presentation**: number formats, string and rich-text formatters, color blending
//! - **Clocks**: wall clock for hosts, manual clock for deterministic tests

pub mod animator;
pub mod clock;
pub mod easing;
pub mod presentation;
pub mod scheduler;
pub mod sink;

pub use animator::{
    AnimationRequest, AnimatorConfig, AnimatorPhase, Completion, CountingAnimator, DEFAULT_DURATION,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use easing::{Easing, DEFAULT_EASING_RATE, EASE_OUT_USES_EASE_IN_OUT};
pub use presentation::{
    ColorTransition, Presentation, PresentationRule, Presenter, RichTextFormatter,
    StringFormatter,
};
pub use scheduler::{
    SchedulerConfig, SchedulerHandle, TickCallback, TickId, TickRegistration, TickScheduler,
    WakeCallback, DEFAULT_TICK_RATE,
};
pub use sink::{LabelSink, RecordingSink, SinkEvent};

pub use tally_core::{Color, FontWeight, NumberFormat, RichText, SpanStyle, TallyError};
