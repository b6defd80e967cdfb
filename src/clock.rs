//! Time source for entry and link timestamps

use chrono::{DateTime, Utc};

/// Supplies "now" in UTC
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, truncated to microseconds
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        crate::model::now_utc()
    }
}

/// Deterministic clock: each reading advances by a fixed step.
///
/// Makes "updated_at moved forward" assertions exact in tests and replays.
#[derive(Debug)]
pub struct SteppingClock {
    next: std::sync::Mutex<DateTime<Utc>>,
    step: chrono::Duration,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: chrono::Duration) -> Self {
        Self {
            next: std::sync::Mutex::new(start),
            step,
        }
    }

    /// Starts at the current wall-clock time and steps by one millisecond
    pub fn starting_now() -> Self {
        Self::new(crate::model::now_utc(), chrono::Duration::milliseconds(1))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = match self.next.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = *next;
        *next = now + self.step;
        now
    }
}
