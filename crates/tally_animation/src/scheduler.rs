//! Tick scheduler
//!
//! A repeating tick source shared by every animator of a host. Animators
//! register a callback while they have a run in flight and drop the
//! registration when the run completes or is cancelled.
//!
//! The scheduler is driven in one of two ways:
//! - The host calls [`TickScheduler::tick`] from its own event loop, in every
//!   loop mode (idle, scrolling, dragging), at the configured rate.
//! - [`TickScheduler::start_background`] spawns a thread that ticks at the
//!   configured rate regardless of what the host's UI thread is busy with.
//!
//! No lock is held while callbacks run, so a callback may register or cancel
//! other callbacks (including itself).

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default tick rate in Hz
pub const DEFAULT_TICK_RATE: u32 = 30;

/// Callback invoked once per tick
pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback type for waking up the main thread from the tick thread
///
/// Called after every background frame that had registered callbacks.
/// The callback should wake up the event loop (e.g., via an event loop proxy).
pub type WakeCallback = Arc<dyn Fn() + Send + Sync>;

new_key_type! {
    /// Handle to a registered tick callback
    pub struct TickId;
}

/// Scheduler settings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Ticks per second
    pub tick_rate: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
        }
    }
}

struct SchedulerInner {
    callbacks: SlotMap<TickId, TickCallback>,
    tick_rate: u32,
    frames: u64,
}

fn lock(inner: &Mutex<SchedulerInner>) -> MutexGuard<'_, SchedulerInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run every callback registered at the start of the frame.
///
/// Returns true if callbacks are still registered afterwards.
fn run_frame(inner: &Mutex<SchedulerInner>) -> bool {
    let snapshot: Vec<(TickId, TickCallback)> = {
        let mut guard = lock(inner);
        guard.frames += 1;
        guard
            .callbacks
            .iter()
            .map(|(id, cb)| (id, Arc::clone(cb)))
            .collect()
    };

    for (id, callback) in snapshot {
        // Skip callbacks cancelled by an earlier callback in this frame
        if !lock(inner).callbacks.contains_key(id) {
            continue;
        }
        callback();
    }

    !lock(inner).callbacks.is_empty()
}

fn interval_for(rate: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(rate.max(1)))
}

/// The repeating tick source
///
/// This is typically owned by the host application and shared with animators
/// via [`SchedulerHandle`].
pub struct TickScheduler {
    inner: Arc<Mutex<SchedulerInner>>,
    /// Stop signal for background thread
    stop_flag: Arc<AtomicBool>,
    /// Background thread handle (if running)
    thread_handle: Option<JoinHandle<()>>,
    /// Optional callback to wake up the main thread
    wake_callback: Option<WakeCallback>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SchedulerInner {
                callbacks: SlotMap::with_key(),
                tick_rate: config.tick_rate.max(1),
                frames: 0,
            })),
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            wake_callback: None,
        }
    }

    /// Set a wake callback that will be called after background frames
    ///
    /// # Example
    ///
    /// ```ignore
    /// let wake_proxy = event_loop.wake_proxy();
    /// scheduler.set_wake_callback(move || wake_proxy.wake());
    /// ```
    pub fn set_wake_callback<F>(&mut self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.wake_callback = Some(Arc::new(callback));
    }

    /// Start ticking on a background thread at the configured rate
    ///
    /// Ticks keep firing while the host's UI thread is busy tracking user
    /// interaction. Callbacks then run on the background thread: a tick
    /// already under way when another thread cancels its callback can still
    /// finish. Animators recheck their run right before rendering, so at most
    /// a frame already being pushed to the sink lands after the cancel.
    pub fn start_background(&mut self) {
        if self.thread_handle.is_some() {
            return; // Already running
        }

        let inner = Arc::clone(&self.inner);
        let stop_flag = Arc::clone(&self.stop_flag);
        let wake_callback = self.wake_callback.clone();

        tracing::debug!("TickScheduler: starting background thread");

        self.thread_handle = Some(thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                let start = Instant::now();
                let frame_duration = interval_for(lock(&inner).tick_rate);

                if run_frame(&inner) {
                    if let Some(ref callback) = wake_callback {
                        callback();
                    }
                }

                // Sleep for remaining frame time
                let elapsed = start.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
            }
        }));
    }

    /// Stop the background thread
    pub fn stop_background(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread_handle.take() {
            tracing::debug!("TickScheduler: stopping background thread");
            let _ = handle.join();
        }
        self.stop_flag.store(false, Ordering::Relaxed);
    }

    /// Check if the background thread is running
    pub fn is_background_running(&self) -> bool {
        self.thread_handle.is_some()
    }

    /// Get a handle to this scheduler for passing to animators
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Change the tick rate (Hz). Takes effect on the next background frame.
    pub fn set_tick_rate(&self, rate: u32) {
        lock(&self.inner).tick_rate = rate.max(1);
    }

    pub fn tick_rate(&self) -> u32 {
        lock(&self.inner).tick_rate
    }

    /// Time between two ticks at the current rate
    pub fn tick_interval(&self) -> Duration {
        interval_for(self.tick_rate())
    }

    /// Fire every registered callback once
    ///
    /// Returns true if callbacks are still registered (need another tick).
    pub fn tick(&self) -> bool {
        run_frame(&self.inner)
    }

    /// Number of registered callbacks
    pub fn active_count(&self) -> usize {
        lock(&self.inner).callbacks.len()
    }

    pub fn has_active(&self) -> bool {
        self.active_count() > 0
    }

    /// Number of frames run so far
    pub fn frame_count(&self) -> u64 {
        lock(&self.inner).frames
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        // Stop background thread when scheduler is dropped
        self.stop_background();
    }
}

/// A weak handle to the tick scheduler
///
/// It won't prevent the scheduler from being dropped; registering against a
/// dropped scheduler returns `None`.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<Mutex<SchedulerInner>>,
}

impl SchedulerHandle {
    /// Register a callback fired on every tick
    ///
    /// The callback stays registered until the returned registration is
    /// dropped or cancelled.
    pub fn register<F>(&self, callback: F) -> Option<TickRegistration>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.upgrade().map(|inner| {
            let id = lock(&inner).callbacks.insert(Arc::new(callback));
            TickRegistration {
                handle: self.clone(),
                id,
            }
        })
    }

    /// Check whether a callback is still registered
    pub fn is_registered(&self, id: TickId) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| lock(&inner).callbacks.contains_key(id))
    }

    /// Check if the scheduler is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    fn unregister(&self, id: TickId) {
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner).callbacks.remove(id);
        }
    }
}

/// Owned registration of a tick callback
///
/// Dropping it unregisters the callback before `drop` returns.
pub struct TickRegistration {
    handle: SchedulerHandle,
    id: TickId,
}

impl TickRegistration {
    pub fn id(&self) -> TickId {
        self.id
    }

    /// Unregister explicitly (same as dropping)
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TickRegistration {
    fn drop(&mut self) {
        self.handle.unregister(self.id);
    }
}

impl std::fmt::Debug for TickRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickRegistration").field("id", &self.id).finish()
    }
}
