//! Pacing of remote mutations.
//!
//! The calendar API rate-limits writes per user, so every insert, update and
//! delete is followed by a [`Throttle::pause`].

use std::time::Duration;

use icalsync_providers::BoxFuture;

/// Pause policy applied after each remote mutation.
pub trait Throttle: Send + Sync {
    /// Waits before the next remote call may be issued.
    fn pause(&self) -> BoxFuture<'_, ()>;
}

/// Sleeps for a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Creates a throttle sleeping `delay` after each mutation.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// The configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Throttle for FixedDelay {
    fn pause(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        })
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Throttle for NoDelay {
    fn pause(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}
