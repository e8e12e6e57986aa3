//! Catch-up scheduler keeping emulated time aligned with wall-clock time.
//!
//! Platform timers only wake the harness about once per millisecond, far
//! slower than the emulated instruction rate. Each tick therefore raises the
//! lateness flag and keeps stepping the core until the core itself reports,
//! through [`Hal::sleep_until`](crate::Hal::sleep_until), that it has run
//! ahead of the wall clock.

use log::{debug, warn};

use crate::clock::Clock;
use crate::cpu::CpuCore;
use crate::hal::{HalBridge, Vibrator};

/// Default ceiling on steps executed in one tick.
pub const DEFAULT_MAX_STEPS_PER_TICK: u32 = 50_000;

/// How a single scheduler tick ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickOutcome {
    /// The core caught up with the wall clock.
    CaughtUp {
        /// Steps executed during the tick.
        steps: u32,
    },
    /// The step ceiling was reached while the core was still late.
    Capped {
        /// Steps executed during the tick (equal to the ceiling).
        steps: u32,
    },
}

impl TickOutcome {
    /// Steps executed during the tick.
    #[must_use]
    pub const fn steps(self) -> u32 {
        match self {
            Self::CaughtUp { steps } | Self::Capped { steps } => steps,
        }
    }

    /// Returns `true` when the tick stopped at the step ceiling.
    #[must_use]
    pub const fn is_capped(self) -> bool {
        matches!(self, Self::Capped { .. })
    }
}

/// Drives batches of CPU steps per tick, bounded by a step ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchUpScheduler {
    max_steps_per_tick: u32,
    capped_streak: u32,
    total_steps: u64,
}

impl Default for CatchUpScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS_PER_TICK)
    }
}

impl CatchUpScheduler {
    /// Creates a scheduler. A ceiling of zero is raised to one step.
    #[must_use]
    pub fn new(max_steps_per_tick: u32) -> Self {
        Self {
            max_steps_per_tick: max_steps_per_tick.max(1),
            capped_streak: 0,
            total_steps: 0,
        }
    }

    /// Step ceiling per tick.
    #[must_use]
    pub const fn max_steps_per_tick(&self) -> u32 {
        self.max_steps_per_tick
    }

    /// Consecutive ticks that ended at the ceiling.
    #[must_use]
    pub const fn capped_streak(&self) -> u32 {
        self.capped_streak
    }

    /// Steps executed since the scheduler was created.
    #[must_use]
    pub const fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Runs one tick: mark the core late, then step until it catches up or
    /// the ceiling is reached.
    pub fn tick<K, C, V>(&mut self, core: &mut K, bridge: &mut HalBridge<C, V>) -> TickOutcome
    where
        K: CpuCore + ?Sized,
        C: Clock,
        V: Vibrator,
    {
        bridge.mark_late();

        let mut steps = 0_u32;
        while bridge.is_late() && steps < self.max_steps_per_tick {
            core.step(&mut *bridge);
            steps += 1;
        }
        self.total_steps += u64::from(steps);

        if bridge.is_late() {
            if self.capped_streak == 0 {
                warn!(
                    "cpu still behind wall clock after {steps} steps, deferring catch-up to next tick"
                );
            }
            self.capped_streak = self.capped_streak.saturating_add(1);
            TickOutcome::Capped { steps }
        } else {
            if self.capped_streak > 0 {
                debug!("cpu caught up after {} capped ticks", self.capped_streak);
                self.capped_streak = 0;
            }
            TickOutcome::CaughtUp { steps }
        }
    }
}
