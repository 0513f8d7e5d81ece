//! Counting animator
//!
//! Animates a label's numeric value from a start to an end number over a
//! fixed duration. Each tick of the [`TickScheduler`](crate::TickScheduler)
//! advances the run's elapsed time, samples the easing curve and pushes the
//! formatted value (plus a blended color, when configured) to the label sink.
//!
//! ```text
//!   Idle ──start──▶ Running ──elapsed ≥ duration──▶ Completed
//!                    │  ▲                              │
//!                    └──┘ start (supersede)            └──start──▶ Running
//!   Running ──cancel──▶ Idle
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tally_animation::{CountingAnimator, RecordingSink, TickScheduler};
//!
//! let scheduler = TickScheduler::new();
//! let label = Arc::new(RecordingSink::new());
//! let counter = CountingAnimator::new(scheduler.handle()).with_sink(label.clone());
//!
//! // Zero duration completes right away
//! counter.increment(0.0, 100.0, 0.0, None);
//! assert_eq!(counter.current_value(), 100.0);
//! assert_eq!(label.last_text().as_deref(), Some("100"));
//! ```

use crate::clock::{Clock, SystemClock};
use crate::easing::{Easing, DEFAULT_EASING_RATE};
use crate::presentation::{
    isolate, ColorTransition, Frame, Presenter, RichTextFormatter, StringFormatter,
};
use crate::scheduler::{SchedulerHandle, TickRegistration};
use crate::sink::LabelSink;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tally_core::{Color, NumberFormat, Result, RichText, DEFAULT_FORMAT};

/// Duration used by hosts that don't pick one, in seconds
pub const DEFAULT_DURATION: f64 = 0.3;

/// Called once when a run reaches its end value
pub type Completion = Box<dyn FnOnce() + Send>;

/// Parameters of one run
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationRequest {
    pub from_value: f64,
    pub to_value: f64,
    /// Seconds
    pub duration: f64,
    pub easing: Easing,
    pub easing_rate: f64,
}

impl AnimationRequest {
    /// Value at a normalized time fraction
    pub fn value_at(&self, t: f64) -> f64 {
        let progress = self.easing.apply(t, self.easing_rate);
        self.from_value + progress * (self.to_value - self.from_value)
    }
}

impl Default for AnimationRequest {
    fn default() -> Self {
        Self {
            from_value: 0.0,
            to_value: 0.0,
            duration: DEFAULT_DURATION,
            easing: Easing::Linear,
            easing_rate: DEFAULT_EASING_RATE,
        }
    }
}

/// Progress of the current run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct AnimationState {
    elapsed: Duration,
    is_running: bool,
    /// Clock reading at the previous tick
    last_tick: Duration,
}

/// Lifecycle phase of an animator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnimatorPhase {
    #[default]
    Idle,
    Running,
    Completed,
}

/// Serializable animator defaults
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorConfig {
    pub easing: Easing,
    pub easing_rate: f64,
    pub format: String,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            easing: Easing::Linear,
            easing_rate: DEFAULT_EASING_RATE,
            format: DEFAULT_FORMAT.to_string(),
        }
    }
}

/// Convert host seconds
///
/// NaN and non-positive durations become zero. Positive durations too long
/// for `Duration` (including infinity) saturate to `Duration::MAX`.
fn run_duration(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

struct AnimatorInner {
    easing: Easing,
    easing_rate: f64,
    presenter: Presenter,
    sink: Option<Arc<dyn LabelSink>>,

    request: AnimationRequest,
    duration: Duration,
    state: AnimationState,
    phase: AnimatorPhase,
    colors: Option<ColorTransition>,
    completion: Option<Completion>,
    registration: Option<TickRegistration>,
    /// Bumped on every start and cancel; stale tick callbacks compare against it
    generation: u64,
}

impl AnimatorInner {
    fn current_value(&self) -> f64 {
        if self.state.elapsed >= self.duration {
            return self.request.to_value;
        }
        self.request.value_at(self.fraction())
    }

    /// Raw elapsed fraction in `0.0..=1.0`
    fn fraction(&self) -> f64 {
        if self.duration.is_zero() || self.state.elapsed >= self.duration {
            return 1.0;
        }
        self.state.elapsed.as_secs_f64() / self.duration.as_secs_f64()
    }

    fn frame(&self, with_color: bool) -> Frame {
        Frame {
            value: self.current_value(),
            fraction: self.fraction(),
            presenter: self.presenter.clone(),
            colors: if with_color { self.colors } else { None },
            sink: self.sink.clone(),
        }
    }

    /// Release the tick registration and invalidate in-flight callbacks
    fn stop_ticking(&mut self) {
        self.registration = None;
        self.generation = self.generation.wrapping_add(1);
    }
}

fn lock(inner: &Mutex<AnimatorInner>) -> MutexGuard<'_, AnimatorInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run the completion outside any lock
fn complete(completion: Option<Completion>) {
    if let Some(completion) = completion {
        isolate("completion callback", completion);
    }
}

/// One tick of a run
fn advance(inner: &Weak<Mutex<AnimatorInner>>, clock: &dyn Clock, generation: u64) {
    let Some(inner) = inner.upgrade() else { return };

    let (frame, completion, current) = {
        let mut guard = lock(&inner);
        if guard.generation != generation || !guard.state.is_running {
            return;
        }

        let now = clock.now();
        let delta = now.saturating_sub(guard.state.last_tick);
        guard.state.elapsed = guard.state.elapsed.saturating_add(delta);
        guard.state.last_tick = now;

        let mut completion = None;
        if guard.state.elapsed >= guard.duration {
            guard.state.elapsed = guard.duration;
            guard.state.is_running = false;
            guard.phase = AnimatorPhase::Completed;
            guard.stop_ticking();
            completion = guard.completion.take();
            tracing::debug!(to = guard.request.to_value, "counter run completed");
        }

        (guard.frame(true), completion, guard.generation)
    };

    // Cancelled or restarted from another thread since the lock was released
    if lock(&inner).generation != current {
        return;
    }
    frame.render();
    complete(completion);
}

/// Animates a label from one number to another
///
/// At most one run is in flight per animator: every start cancels the
/// previous run first. Dropping the animator cancels its run.
pub struct CountingAnimator {
    inner: Arc<Mutex<AnimatorInner>>,
    scheduler: SchedulerHandle,
    clock: Arc<dyn Clock>,
}

impl CountingAnimator {
    /// Create an idle animator ticking on the given scheduler
    pub fn new(scheduler: SchedulerHandle) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AnimatorInner {
                easing: Easing::Linear,
                easing_rate: DEFAULT_EASING_RATE,
                presenter: Presenter::new(),
                sink: None,
                request: AnimationRequest::default(),
                duration: run_duration(DEFAULT_DURATION),
                state: AnimationState::default(),
                phase: AnimatorPhase::Idle,
                colors: None,
                completion: None,
                registration: None,
                generation: 0,
            })),
            scheduler,
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Use another time source (builder pattern)
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Attach the host label (builder pattern)
    pub fn with_sink(self, sink: Arc<dyn LabelSink>) -> Self {
        lock(&self.inner).sink = Some(sink);
        self
    }

    /// Apply serialized defaults (builder pattern)
    pub fn with_config(self, config: &AnimatorConfig) -> Result<Self> {
        let format = NumberFormat::parse(&config.format)?;
        {
            let mut inner = lock(&self.inner);
            inner.easing = config.easing;
            inner.easing_rate = config.easing_rate;
            inner.presenter.set_format(format);
        }
        Ok(self)
    }

    fn lock(&self) -> MutexGuard<'_, AnimatorInner> {
        lock(&self.inner)
    }

    // =========================================================================
    // Launchers
    // =========================================================================

    /// Count from `from` to `to` over `duration` seconds
    pub fn increment(&self, from: f64, to: f64, duration: f64, completion: Option<Completion>) {
        self.start(from, to, duration, None, completion);
    }

    /// Count from the value currently displayed to `to`
    pub fn increment_from_current_value(
        &self,
        to: f64,
        duration: f64,
        completion: Option<Completion>,
    ) {
        let from = self.current_value();
        self.start(from, to, duration, None, completion);
    }

    /// Count from zero to `to`
    pub fn increment_from_zero(&self, to: f64, duration: f64, completion: Option<Completion>) {
        self.start(0.0, to, duration, None, completion);
    }

    /// Count from `from` to `to` while blending the label color
    pub fn increment_with_colors(
        &self,
        from: f64,
        to: f64,
        start_color: Color,
        end_color: Color,
        duration: f64,
        completion: Option<Completion>,
    ) {
        let colors = ColorTransition::new(start_color, end_color);
        self.start(from, to, duration, Some(colors), completion);
    }

    fn start(
        &self,
        from: f64,
        to: f64,
        duration: f64,
        colors: Option<ColorTransition>,
        completion: Option<Completion>,
    ) {
        let now = self.clock.now();

        let immediate = {
            let mut inner = self.lock();

            if inner.state.is_running {
                tracing::debug!(
                    from = inner.request.from_value,
                    to = inner.request.to_value,
                    "superseding counter run"
                );
            }
            // Previous registration is released before the new one exists
            inner.stop_ticking();

            inner.request = AnimationRequest {
                from_value: from,
                to_value: to,
                duration,
                easing: inner.easing,
                easing_rate: inner.easing_rate,
            };
            inner.duration = run_duration(duration);
            inner.state = AnimationState {
                elapsed: Duration::ZERO,
                is_running: true,
                last_tick: now,
            };
            inner.colors = colors;
            inner.completion = completion;

            tracing::debug!(from, to, duration, easing = %inner.easing, "counter run started");

            if inner.duration.is_zero() {
                inner.state.is_running = false;
                inner.phase = AnimatorPhase::Completed;
                tracing::debug!(to, "counter run completed immediately");
                Some((inner.frame(true), inner.completion.take()))
            } else {
                let weak = Arc::downgrade(&self.inner);
                let clock = Arc::clone(&self.clock);
                let generation = inner.generation;
                inner.registration = self
                    .scheduler
                    .register(move || advance(&weak, clock.as_ref(), generation));

                if inner.registration.is_none() {
                    tracing::warn!("tick scheduler is gone; counter run will not advance");
                }
                inner.phase = AnimatorPhase::Running;
                None
            }
        };

        if let Some((frame, completion)) = immediate {
            frame.render();
            complete(completion);
        }
    }

    /// Stop the current run without completing it
    ///
    /// The label keeps its last rendered value and the completion is dropped
    /// uncalled. Does nothing when no run is in flight.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        if !inner.state.is_running {
            return;
        }

        inner.stop_ticking();
        inner.state.is_running = false;
        inner.phase = AnimatorPhase::Idle;
        let completion = inner.completion.take();
        tracing::debug!(to = inner.request.to_value, "counter run cancelled");
        drop(inner);

        // Dropped outside the lock in case its captures touch this animator
        drop(completion);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The value the label is displaying right now
    pub fn current_value(&self) -> f64 {
        self.lock().current_value()
    }

    pub fn is_running(&self) -> bool {
        self.lock().state.is_running
    }

    pub fn phase(&self) -> AnimatorPhase {
        self.lock().phase
    }

    /// Elapsed time of the current (or last) run, in seconds
    pub fn elapsed(&self) -> f64 {
        self.lock().state.elapsed.as_secs_f64()
    }

    /// Parameters of the current (or last) run
    pub fn request(&self) -> AnimationRequest {
        self.lock().request
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn easing(&self) -> Easing {
        self.lock().easing
    }

    /// Easing for the next run
    pub fn set_easing(&self, easing: Easing) {
        self.lock().easing = easing;
    }

    pub fn easing_rate(&self) -> f64 {
        self.lock().easing_rate
    }

    /// Easing exponent for the next run
    pub fn set_easing_rate(&self, rate: f64) {
        self.lock().easing_rate = rate;
    }

    pub fn format(&self) -> String {
        self.lock().presenter.format().as_str().to_string()
    }

    /// Replace the number format and re-render the current value
    ///
    /// A malformed format is rejected and the previous one stays in effect.
    pub fn set_format(&self, format: &str) -> Result<()> {
        let parsed = match NumberFormat::parse(format) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!("rejecting label format: {}", err);
                return Err(err);
            }
        };

        let frame = {
            let mut inner = self.lock();
            inner.presenter.set_format(parsed);
            inner.frame(false)
        };
        frame.render();
        Ok(())
    }

    pub fn set_string_formatter<F>(&self, formatter: F)
    where
        F: Fn(f64) -> String + Send + Sync + 'static,
    {
        let formatter: StringFormatter = Arc::new(formatter);
        self.lock().presenter.set_string_formatter(Some(formatter));
    }

    pub fn set_rich_text_formatter<F>(&self, formatter: F)
    where
        F: Fn(f64) -> RichText + Send + Sync + 'static,
    {
        let formatter: RichTextFormatter = Arc::new(formatter);
        self.lock().presenter.set_rich_formatter(Some(formatter));
    }

    /// Drop both custom formatters, falling back to the number format
    pub fn clear_formatters(&self) {
        let mut inner = self.lock();
        inner.presenter.set_string_formatter(None);
        inner.presenter.set_rich_formatter(None);
    }

    pub fn set_sink(&self, sink: Arc<dyn LabelSink>) {
        self.lock().sink = Some(sink);
    }
}

impl Drop for CountingAnimator {
    fn drop(&mut self) {
        let completion = {
            let mut inner = self.lock();
            inner.stop_ticking();
            inner.state.is_running = false;
            inner.completion.take()
        };
        drop(completion);
    }
}

impl std::fmt::Debug for CountingAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("CountingAnimator")
            .field("phase", &inner.phase)
            .field("request", &inner.request)
            .field("state", &inner.state)
            .field("presenter", &inner.presenter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::scheduler::TickScheduler;
    use crate::sink::RecordingSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        scheduler: TickScheduler,
        clock: ManualClock,
        sink: Arc<RecordingSink>,
        counter: CountingAnimator,
    }

    impl Harness {
        fn new() -> Self {
            let scheduler = TickScheduler::new();
            let clock = ManualClock::new();
            let sink = Arc::new(RecordingSink::new());
            let counter = CountingAnimator::new(scheduler.handle())
                .with_clock(clock.clone())
                .with_sink(sink.clone());
            Self {
                scheduler,
                clock,
                sink,
                counter,
            }
        }

        fn step(&self, delta: Duration) {
            self.clock.advance(delta);
            self.scheduler.tick();
        }
    }

    fn counting_completion() -> (Arc<AtomicUsize>, Completion) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (
            count,
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_idle_animator() {
        let h = Harness::new();
        assert_eq!(h.counter.phase(), AnimatorPhase::Idle);
        assert_eq!(h.counter.current_value(), 0.0);
        assert!(!h.counter.is_running());
        assert_eq!(h.counter.format(), "%d");
        assert_eq!(h.counter.easing_rate(), 3.0);
    }

    #[test]
    fn test_value_at_start_is_from_value() {
        let h = Harness::new();
        h.counter.increment(10.0, 20.0, 1.0, None);
        assert_eq!(h.counter.phase(), AnimatorPhase::Running);
        assert_eq!(h.counter.current_value(), 10.0);
        assert_eq!(h.scheduler.active_count(), 1);
    }

    #[test]
    fn test_tick_advances_and_completes() {
        let h = Harness::new();
        let (count, completion) = counting_completion();
        h.counter.increment(0.0, 10.0, 1.0, Some(completion));

        h.step(Duration::from_millis(500));
        assert!((h.counter.current_value() - 5.0).abs() < 1e-9);
        assert_eq!(h.sink.last_text().as_deref(), Some("5"));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        h.step(Duration::from_millis(700));
        assert_eq!(h.counter.current_value(), 10.0);
        assert_eq!(h.counter.elapsed(), 1.0);
        assert_eq!(h.counter.phase(), AnimatorPhase::Completed);
        assert_eq!(h.sink.last_text().as_deref(), Some("10"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(h.scheduler.active_count(), 0);

        // Further ticks change nothing
        h.step(Duration::from_millis(100));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_completion_runs_after_final_render() {
        let h = Harness::new();
        let sink = Arc::clone(&h.sink);
        let seen = Arc::new(Mutex::new(None));
        let seen_in_completion = Arc::clone(&seen);
        h.counter.increment(
            0.0,
            3.0,
            0.1,
            Some(Box::new(move || {
                *seen_in_completion.lock().unwrap() = sink.last_text();
            })),
        );

        h.step(Duration::from_millis(200));
        assert_eq!(seen.lock().unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let h = Harness::new();
        let (count, completion) = counting_completion();
        h.counter.increment(5.0, 42.0, 0.0, Some(completion));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(h.counter.current_value(), 42.0);
        assert_eq!(h.counter.phase(), AnimatorPhase::Completed);
        assert_eq!(h.scheduler.active_count(), 0);
        assert_eq!(h.sink.last_text().as_deref(), Some("42"));
    }

    #[test]
    fn test_negative_and_nan_durations_complete_immediately() {
        let h = Harness::new();
        for duration in [-1.0, f64::NAN] {
            let (count, completion) = counting_completion();
            h.counter.increment(0.0, 7.0, duration, Some(completion));
            assert_eq!(count.load(Ordering::SeqCst), 1);
            assert_eq!(h.counter.current_value(), 7.0);
            assert!(!h.scheduler.has_active());
        }
    }

    #[test]
    fn test_overlong_durations_keep_running() {
        let h = Harness::new();
        for duration in [1e20, f64::INFINITY] {
            let (count, completion) = counting_completion();
            h.counter.increment(0.0, 100.0, duration, Some(completion));
            assert_eq!(h.counter.phase(), AnimatorPhase::Running);
            assert_eq!(h.scheduler.active_count(), 1);

            h.step(Duration::from_secs(60));
            assert!(h.counter.is_running());
            assert!(h.counter.current_value() < 100.0);
            assert_eq!(count.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn test_cancel_from_sibling_completion_stops_frames() {
        let h = Harness::new();
        let other_sink = Arc::new(RecordingSink::new());
        let other = Arc::new(
            CountingAnimator::new(h.scheduler.handle())
                .with_clock(h.clock.clone())
                .with_sink(other_sink.clone()),
        );

        // Registered first, so it ticks first in each frame
        let target = Arc::downgrade(&other);
        h.counter.increment(
            0.0,
            1.0,
            0.1,
            Some(Box::new(move || {
                if let Some(other) = target.upgrade() {
                    other.cancel();
                }
            })),
        );
        other.increment(0.0, 100.0, 1.0, None);

        h.step(Duration::from_millis(200));
        assert_eq!(other.phase(), AnimatorPhase::Idle);
        assert!(other_sink.texts().is_empty());
        assert_eq!(h.scheduler.active_count(), 0);
    }

    #[test]
    fn test_restart_cancels_previous_run() {
        let h = Harness::new();
        let (first, first_completion) = counting_completion();
        let (second, second_completion) = counting_completion();

        h.counter.increment(0.0, 100.0, 1.0, Some(first_completion));
        h.step(Duration::from_millis(100));
        h.counter.increment(0.0, 50.0, 1.0, Some(second_completion));
        assert_eq!(h.scheduler.active_count(), 1);

        for _ in 0..20 {
            h.step(Duration::from_millis(100));
        }

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(h.counter.current_value(), 50.0);
    }

    #[test]
    fn test_cancel_is_silent_and_idempotent() {
        let h = Harness::new();
        let (count, completion) = counting_completion();
        h.counter.increment(0.0, 100.0, 1.0, Some(completion));
        h.step(Duration::from_millis(250));
        let frames = h.sink.texts().len();

        h.counter.cancel();
        assert_eq!(h.counter.phase(), AnimatorPhase::Idle);
        assert_eq!(h.scheduler.active_count(), 0);
        assert!((h.counter.current_value() - 25.0).abs() < 1e-9);

        h.counter.cancel();
        h.step(Duration::from_secs(2));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(h.sink.texts().len(), frames);
    }

    #[test]
    fn test_cancel_after_completion_is_noop() {
        let h = Harness::new();
        let (count, completion) = counting_completion();
        h.counter.increment(0.0, 1.0, 0.0, Some(completion));
        h.counter.cancel();
        assert_eq!(h.counter.phase(), AnimatorPhase::Completed);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_increment_from_current_value() {
        let h = Harness::new();
        h.counter.increment(0.0, 100.0, 1.0, None);
        h.step(Duration::from_millis(400));
        h.counter.increment_from_current_value(0.0, 1.0, None);

        let request = h.counter.request();
        assert!((request.from_value - 40.0).abs() < 1e-9);
        assert_eq!(request.to_value, 0.0);
        assert!((h.counter.current_value() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_increment_from_zero() {
        let h = Harness::new();
        h.counter.increment(70.0, 80.0, 0.0, None);
        h.counter.increment_from_zero(10.0, 1.0, None);
        assert_eq!(h.counter.request().from_value, 0.0);
        assert_eq!(h.counter.current_value(), 0.0);
    }

    #[test]
    fn test_set_format_rerenders_while_idle() {
        let h = Harness::new();
        h.counter.increment(0.0, 12.5, 0.0, None);
        assert_eq!(h.sink.last_text().as_deref(), Some("12"));

        h.counter.set_format("%.1f").unwrap();
        assert_eq!(h.sink.last_text().as_deref(), Some("12.5"));
        assert_eq!(h.counter.format(), "%.1f");
    }

    #[test]
    fn test_invalid_format_keeps_previous() {
        let h = Harness::new();
        let before = h.sink.events().len();
        assert!(h.counter.set_format("%s").is_err());
        assert_eq!(h.counter.format(), "%d");
        assert_eq!(h.sink.events().len(), before);
    }

    #[test]
    fn test_easing_applies_to_next_run() {
        let h = Harness::new();
        h.counter.set_easing(Easing::EaseIn);
        h.counter.set_easing_rate(2.0);
        h.counter.increment(0.0, 100.0, 1.0, None);

        h.step(Duration::from_millis(500));
        assert!((h.counter.current_value() - 25.0).abs() < 1e-9);

        // Mid-run changes don't bend the current curve
        h.counter.set_easing(Easing::Linear);
        assert!((h.counter.current_value() - 25.0).abs() < 1e-9);
        assert_eq!(h.counter.request().easing, Easing::EaseIn);
    }

    #[test]
    fn test_color_transition_blends_by_elapsed_fraction() {
        let h = Harness::new();
        h.counter.set_easing(Easing::EaseIn);
        h.counter
            .increment_with_colors(0.0, 100.0, Color::BLACK, Color::GREEN, 2.0, None);

        h.step(Duration::from_secs(1));
        let color = h.sink.last_color().unwrap();
        assert!((color.g - 0.5).abs() < 1e-6);
        assert!(color.r.abs() < 1e-6 && color.b.abs() < 1e-6);
        // Value is eased, color is not
        assert!((h.counter.current_value() - 12.5).abs() < 1e-9);

        h.step(Duration::from_secs(1));
        assert_eq!(h.sink.last_color(), Some(Color::GREEN));
    }

    #[test]
    fn test_plain_increment_clears_color_transition() {
        let h = Harness::new();
        h.counter
            .increment_with_colors(0.0, 1.0, Color::BLACK, Color::GREEN, 0.0, None);
        let colors = h.sink.colors().len();

        h.counter.increment(0.0, 1.0, 0.0, None);
        assert_eq!(h.sink.colors().len(), colors);
    }

    #[test]
    fn test_panicking_formatter_does_not_stall_run() {
        let h = Harness::new();
        let (count, completion) = counting_completion();
        h.counter
            .set_string_formatter(|_| -> String { panic!("formatter exploded") });
        h.counter.increment(0.0, 10.0, 0.2, Some(completion));

        for _ in 0..5 {
            h.step(Duration::from_millis(50));
        }

        assert_eq!(h.counter.phase(), AnimatorPhase::Completed);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(h.sink.texts().is_empty());
    }

    #[test]
    fn test_nan_value_keeps_previous_text() {
        let h = Harness::new();
        h.counter.set_easing(Easing::EaseInOut);
        h.counter.set_easing_rate(2.5);
        h.counter.increment(0.0, 100.0, 1.0, None);

        h.step(Duration::from_millis(250));
        let first = h.sink.last_text();
        assert!(first.is_some());

        // Second half of ease-in-out with a fractional rate is NaN
        h.step(Duration::from_millis(500));
        assert_eq!(h.sink.last_text(), first);
        assert!(h.counter.is_running());

        h.step(Duration::from_millis(500));
        assert_eq!(h.sink.last_text().as_deref(), Some("100"));
    }

    #[test]
    fn test_completion_can_chain_a_new_run() {
        let h = Harness::new();
        let counter = Arc::new(h.counter);
        let chained = Arc::downgrade(&counter);
        counter.increment(
            0.0,
            10.0,
            0.1,
            Some(Box::new(move || {
                if let Some(counter) = chained.upgrade() {
                    counter.increment(10.0, 20.0, 0.1, None);
                }
            })),
        );

        h.clock.advance(Duration::from_millis(150));
        h.scheduler.tick();
        assert_eq!(counter.phase(), AnimatorPhase::Running);
        assert_eq!(counter.request().from_value, 10.0);

        h.clock.advance(Duration::from_millis(150));
        h.scheduler.tick();
        assert_eq!(counter.current_value(), 20.0);
    }

    #[test]
    fn test_drop_releases_registration() {
        let h = Harness::new();
        h.counter.increment(0.0, 1.0, 10.0, None);
        assert_eq!(h.scheduler.active_count(), 1);

        let Harness {
            scheduler, counter, ..
        } = h;
        drop(counter);
        assert_eq!(scheduler.active_count(), 0);
        assert!(!scheduler.tick());
    }

    #[test]
    fn test_with_config() {
        let scheduler = TickScheduler::new();
        let config = AnimatorConfig {
            easing: Easing::EaseInOut,
            easing_rate: 5.0,
            format: "%.2f".to_string(),
        };
        let counter = CountingAnimator::new(scheduler.handle())
            .with_config(&config)
            .unwrap();
        assert_eq!(counter.easing(), Easing::EaseInOut);
        assert_eq!(counter.easing_rate(), 5.0);
        assert_eq!(counter.format(), "%.2f");

        let bad = AnimatorConfig {
            format: "%q".to_string(),
            ..AnimatorConfig::default()
        };
        assert!(CountingAnimator::new(scheduler.handle())
            .with_config(&bad)
            .is_err());
    }
}
