//! Cancellable coalescing timer.

use std::time::{Duration, Instant};

/// Collapses bursts of trigger events into a single firing.
///
/// Every [`trigger`](Debouncer::trigger) restarts the delay window; the
/// embedding event loop polls [`fire`](Debouncer::fire) (e.g. on its next
/// tick or timeout callback), which reports true exactly once after the
/// window has elapsed with no further triggers. Time is injected so the
/// primitive tests without sleeping.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Debouncer {
        Debouncer {
            delay,
            deadline: None,
        }
    }

    /// Arm (or re-arm) the timer.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// True exactly once when the armed window has elapsed; disarms.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}
