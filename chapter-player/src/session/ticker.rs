//! Position ticker
//!
//! Fixed-interval sampling of the engine position. The ticker is polled from
//! the control task's `select!` loop, so each tick runs on the same task that
//! owns the session state. A sample is only published when it differs from
//! the last one published.
//!
//! The ticker is owned by the control task alone and is never shared, so its
//! cancellation flag is a plain `bool` rather than an atomic. Only session
//! teardown cancels it.

use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};

pub struct PositionTicker {
    period: Duration,
    interval: Option<Interval>,
    last_published: u64,
    /// Not shared across tasks
    cancelled: bool,
}

impl PositionTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
            last_published: 0,
            cancelled: false,
        }
    }

    /// Wait for the next tick
    ///
    /// Missed ticks are not bunched up: a delayed tick pushes the schedule back.
    pub async fn tick(&mut self) {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
    }

    /// Filter a sampled position
    ///
    /// Returns the value to publish, or `None` if it equals the last published
    /// value.
    pub fn observe(&mut self, position_ms: u64) -> Option<u64> {
        if position_ms == self.last_published {
            return None;
        }
        self.last_published = position_ms;
        Some(position_ms)
    }

    /// Stop rescheduling; safe to call any number of times
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.interval = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}
