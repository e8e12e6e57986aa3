//! Recurring interval timer polled from a cooperative event loop.

use crate::clock::{is_after, Timestamp};

/// Recurring timer with a fixed period.
///
/// A ticker fires at most once per [`Ticker::poll`]. The next deadline is
/// computed from the time the tick was taken rather than from the missed
/// deadline, so a late wake-up never produces a burst of back-to-back ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticker {
    period_us: u32,
    deadline: Option<Timestamp>,
}

impl Ticker {
    /// Creates a ticker whose first tick is due one period after `now`.
    #[must_use]
    pub const fn new(period_us: u32, now: Timestamp) -> Self {
        Self {
            period_us,
            deadline: Some(now.wrapping_add(period_us)),
        }
    }

    /// Creates a ticker firing `hz` times per second.
    ///
    /// A rate of zero yields a ticker that never fires.
    #[must_use]
    pub const fn from_rate_hz(hz: u32, now: Timestamp) -> Self {
        if hz == 0 {
            return Self {
                period_us: 0,
                deadline: None,
            };
        }
        Self::new(1_000_000 / hz, now)
    }

    /// Period between ticks in microseconds.
    #[must_use]
    pub const fn period_us(&self) -> u32 {
        self.period_us
    }

    /// Next deadline, or `None` once cancelled.
    #[must_use]
    pub const fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// Returns `true` when the ticker is armed and its deadline has passed.
    #[must_use]
    pub const fn is_due(&self, now: Timestamp) -> bool {
        match self.deadline {
            Some(deadline) => !is_after(deadline, now),
            None => false,
        }
    }

    /// Arms the next tick one period after `now`. No-op once cancelled.
    pub const fn rearm(&mut self, now: Timestamp) {
        if self.deadline.is_some() {
            self.deadline = Some(now.wrapping_add(self.period_us));
        }
    }

    /// Fires and re-arms in one go when due.
    pub const fn poll(&mut self, now: Timestamp) -> bool {
        if self.is_due(now) {
            self.rearm(now);
            true
        } else {
            false
        }
    }

    /// Stops the ticker for good.
    pub const fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns `true` until [`Ticker::cancel`] is called.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}
