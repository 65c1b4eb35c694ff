//! Time sources.
//!
//! Everything in the engine that reads wall-clock time or waits goes through
//! [`Clock`], so tests can pin "now" and make pre-submission delays instant.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{FixedOffset, Local, NaiveDateTime, Utc};
use parking_lot::Mutex;

/// Source of local time, monotonic elapsed time, and suspension.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current local date-time in the platform's timezone.
    fn now_local(&self) -> NaiveDateTime;

    /// Monotonic time elapsed since the clock was created.
    fn elapsed(&self) -> Duration;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the OS and the tokio timer.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    offset: Option<FixedOffset>,
}

impl SystemClock {
    /// Clock reporting local time in the host timezone.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: None,
        }
    }

    /// Clock reporting local time at a fixed UTC offset, independent of the host.
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            origin: Instant::now(),
            offset: Some(offset),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset).naive_local(),
            None => Local::now().naive_local(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

struct ManualState {
    local: NaiveDateTime,
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

/// Deterministic clock for tests: sleeping advances time instantly.
pub struct ManualClock {
    state: Mutex<ManualState>,
}

impl ManualClock {
    /// Create a clock frozen at `local`.
    pub fn new(local: NaiveDateTime) -> Self {
        Self {
            state: Mutex::new(ManualState {
                local,
                elapsed: Duration::ZERO,
                sleeps: Vec::new(),
            }),
        }
    }

    /// Move both local and monotonic time forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.elapsed += by;
        state.local += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
    }

    /// Every duration passed to [`Clock::sleep`], in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now_local(&self) -> NaiveDateTime {
        self.state.lock().local
    }

    fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    async fn sleep(&self, duration: Duration) {
        self.state.lock().sleeps.push(duration);
        self.advance(duration);
    }
}
