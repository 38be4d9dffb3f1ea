//! # Scheduler primitives
//! Two small state machines that the annotator drives with tokio timers:
//!
//! - [`Throttle`]: at most one detection cycle per interval. Triggers that
//!   arrive while a cycle is running (or cooling down) collapse into a single
//!   pending flag.
//! - [`RetryBatch`]: failed lookups gather into one batch that fires after a
//!   fixed delay plus jitter. Failures arriving while a batch is armed join it.
//!
//! Neither type sleeps itself; callers ask what to do and schedule accordingly.

use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
struct ThrottleState {
    busy: bool,
    pending: bool,
}

/// Busy + pending flags of the detection cycle.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    state: Mutex<ThrottleState>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Mutex::new(ThrottleState::default()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// `true` when the caller may run a cycle now; otherwise the trigger is
    /// folded into the pending flag.
    pub fn try_begin(&self) -> bool {
        let mut s = self.state.lock().expect("throttle mutex poisoned");
        if s.busy {
            s.pending = true;
            false
        } else {
            s.busy = true;
            true
        }
    }

    /// End of the cool-down. Returns whether a trigger arrived meanwhile; the
    /// pending flag is cleared before the caller starts the follow-up cycle.
    pub fn release(&self) -> bool {
        let mut s = self.state.lock().expect("throttle mutex poisoned");
        s.busy = false;
        std::mem::take(&mut s.pending)
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().expect("throttle mutex poisoned").busy
    }
}

#[derive(Debug)]
struct BatchState<T> {
    items: Vec<T>,
    armed: bool,
}

/// Items waiting for the next retry pass.
#[derive(Debug)]
pub struct RetryBatch<T> {
    delay: Duration,
    max_jitter: Duration,
    state: Mutex<BatchState<T>>,
}

impl<T: PartialEq> RetryBatch<T> {
    pub fn new(delay: Duration, max_jitter: Duration) -> Self {
        Self {
            delay,
            max_jitter,
            state: Mutex::new(BatchState {
                items: Vec::new(),
                armed: false,
            }),
        }
    }

    /// Queue `item`. Returns the delay to arm a timer with when no timer is
    /// armed yet; `None` means the item joined the pending batch.
    pub fn push(&self, item: T) -> Option<Duration> {
        let mut s = self.state.lock().expect("retry batch mutex poisoned");
        if !s.items.contains(&item) {
            s.items.push(item);
        }
        if s.armed {
            return None;
        }
        s.armed = true;
        Some(self.delay + self.jitter())
    }

    /// Drain the batch and disarm, so the next failure arms a fresh timer.
    pub fn take(&self) -> Vec<T> {
        let mut s = self.state.lock().expect("retry batch mutex poisoned");
        s.armed = false;
        std::mem::take(&mut s.items)
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("retry batch mutex poisoned").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn jitter(&self) -> Duration {
        let max = self.max_jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max))
    }
}
