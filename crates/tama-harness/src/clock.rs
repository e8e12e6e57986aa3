//! Wall-clock sources at microsecond resolution.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Wall-clock timestamp in microseconds.
///
/// The counter is 32 bits wide and wraps roughly every 71 minutes, matching
/// the timestamp width the CPU core works with. Ordering between two
/// timestamps must always go through [`is_after`].
pub type Timestamp = u32;

/// Returns `true` when `target` lies strictly after `now`.
///
/// Uses the signed wrapping difference so comparisons stay correct across a
/// counter wrap as long as both values are within ~35 minutes of each other.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn is_after(target: Timestamp, now: Timestamp) -> bool {
    (target.wrapping_sub(now) as i32) > 0
}

/// Source of monotonic wall-clock time.
pub trait Clock {
    /// Returns the current timestamp in microseconds.
    fn now(&self) -> Timestamp;
}

/// Host clock anchored to the Unix epoch.
///
/// The wall-clock reading is taken once at creation and then advanced with
/// [`Instant`], so every clock in every process shares one epoch while the
/// reading never steps backwards within a run.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    anchor: Instant,
    anchor_since_epoch: Duration,
}

impl SystemClock {
    /// Creates a clock reading microseconds since the Unix epoch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
            anchor_since_epoch: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now(&self) -> Timestamp {
        // Truncation is the intended wrap.
        (self.anchor_since_epoch + self.anchor.elapsed()).as_micros() as Timestamp
    }
}

/// Manually advanced clock for deterministic hosts and replay.
///
/// Clones share the same counter, so a test or host loop can keep one handle
/// while the HAL bridge owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Timestamp>>,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Moves the clock forward by `micros`, wrapping at the counter width.
    pub fn advance(&self, micros: u32) {
        self.now.set(self.now.get().wrapping_add(micros));
    }

    /// Jumps the clock to an absolute timestamp.
    pub fn set(&self, now: Timestamp) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
