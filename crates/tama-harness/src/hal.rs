//! Hardware abstraction layer between the CPU core and the host platform.
//!
//! The CPU core only ever sees [`Hal`]; [`HalBridge`] is the implementation
//! used by the harness. It owns the display surface and the lateness flag that
//! the catch-up scheduler polls between steps.

use std::fmt;

use log::trace;

use crate::clock::{is_after, Clock, Timestamp};
use crate::display::{DisplaySurface, Icon};

/// Verbosity levels the CPU core may log at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum LogLevel {
    Error,
    Info,
    Memory,
    Cpu,
}

/// Capabilities the CPU core may invoke while executing a step.
///
/// Every call is fire-and-forget. Capabilities this target has no use for
/// (allocation, breakpoints, logging, the generic handler hook) come with
/// no-op defaults.
pub trait Hal {
    /// Allocates scratch storage for breakpoint bookkeeping.
    fn malloc(&mut self, _size: u32) -> Option<Box<[u8]>> {
        None
    }

    /// Returns storage obtained through [`Hal::malloc`].
    fn free(&mut self, _block: Box<[u8]>) {}

    /// Called when the core halts on a breakpoint.
    fn halt(&mut self) {}

    /// Returns `true` when messages at `level` should be passed to [`Hal::log`].
    fn is_log_enabled(&self, _level: LogLevel) -> bool {
        false
    }

    /// Emits a core log message.
    fn log(&mut self, _level: LogLevel, _message: fmt::Arguments<'_>) {}

    /// Current wall-clock time in microseconds.
    fn get_timestamp(&self) -> Timestamp;

    /// Signals that the core has run ahead up to `target`.
    ///
    /// Must never block.
    fn sleep_until(&mut self, target: Timestamp);

    /// Called when the core finishes a display frame.
    fn update_screen(&mut self) {}

    /// Writes one dot-matrix cell.
    fn set_lcd_matrix(&mut self, x: u8, y: u8, on: bool);

    /// Writes one status icon; `icon` is the core's raw icon number.
    fn set_lcd_icon(&mut self, icon: u8, on: bool);

    /// Selects the buzzer frequency in dHz. Hosts without tone output ignore
    /// it.
    fn set_frequency(&mut self, _freq: u32) {}

    /// Turns the buzzer on or off.
    fn play_frequency(&mut self, enabled: bool);

    /// Generic per-step host hook. Returning `true` asks the core to stop.
    fn handler(&mut self) -> bool {
        false
    }
}

/// Vibration pattern made of alternating on/off segments in milliseconds,
/// starting with an on segment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct VibePattern {
    segments_ms: Vec<u32>,
}

impl VibePattern {
    /// Duration of the single alert pulse used by default.
    pub const DEFAULT_PULSE_MS: u32 = 5000;

    /// Builds a pattern from raw segments.
    #[must_use]
    pub const fn new(segments_ms: Vec<u32>) -> Self {
        Self { segments_ms }
    }

    /// Segments in play order.
    #[must_use]
    pub fn segments_ms(&self) -> &[u32] {
        &self.segments_ms
    }

    /// Sum of all segment durations.
    #[must_use]
    pub fn total_ms(&self) -> u64 {
        self.segments_ms.iter().copied().map(u64::from).sum()
    }
}

impl Default for VibePattern {
    fn default() -> Self {
        Self::new(vec![Self::DEFAULT_PULSE_MS])
    }
}

/// Platform vibration motor.
pub trait Vibrator {
    /// Queues `pattern` for playback.
    fn enqueue(&mut self, pattern: &VibePattern);

    /// Stops any pattern in progress and drops queued ones.
    fn cancel(&mut self);
}

/// Vibrator for hosts without a motor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVibrator;

impl Vibrator for NoVibrator {
    fn enqueue(&mut self, _pattern: &VibePattern) {}

    fn cancel(&mut self) {}
}

/// The harness-side [`Hal`] implementation.
#[derive(Debug)]
pub struct HalBridge<C, V> {
    clock: C,
    vibrator: V,
    pattern: VibePattern,
    surface: DisplaySurface,
    late: bool,
}

impl<C: Clock, V: Vibrator> HalBridge<C, V> {
    /// Creates a bridge with a blank display and the default alert pattern.
    pub fn new(clock: C, vibrator: V) -> Self {
        Self::with_pattern(clock, vibrator, VibePattern::default())
    }

    /// Creates a bridge that plays `pattern` whenever the buzzer turns on.
    pub fn with_pattern(clock: C, vibrator: V, pattern: VibePattern) -> Self {
        Self {
            clock,
            vibrator,
            pattern,
            surface: DisplaySurface::new(),
            late: false,
        }
    }

    /// Display buffer as last written by the core.
    pub const fn surface(&self) -> &DisplaySurface {
        &self.surface
    }

    /// Raises the lateness flag at the start of a scheduler tick.
    pub const fn mark_late(&mut self) {
        self.late = true;
    }

    /// Returns `true` while emulated time trails wall-clock time.
    pub const fn is_late(&self) -> bool {
        self.late
    }

    /// The clock this bridge reads.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// The vibrator this bridge drives.
    pub const fn vibrator(&self) -> &V {
        &self.vibrator
    }

    /// Stops any vibration in progress.
    pub fn silence(&mut self) {
        self.vibrator.cancel();
    }
}

impl<C: Clock, V: Vibrator> Hal for HalBridge<C, V> {
    fn get_timestamp(&self) -> Timestamp {
        self.clock.now()
    }

    fn sleep_until(&mut self, target: Timestamp) {
        if is_after(target, self.clock.now()) {
            self.late = false;
        }
    }

    fn set_lcd_matrix(&mut self, x: u8, y: u8, on: bool) {
        if !self.surface.set_pixel(usize::from(x), usize::from(y), on) {
            trace!("ignoring lcd write outside matrix at ({x}, {y})");
        }
    }

    fn set_lcd_icon(&mut self, icon: u8, on: bool) {
        match Icon::from_u8(icon) {
            Some(icon) => self.surface.set_icon(icon, on),
            None => trace!("ignoring write to unknown icon {icon}"),
        }
    }

    fn play_frequency(&mut self, enabled: bool) {
        if enabled {
            self.vibrator.enqueue(&self.pattern);
        } else {
            self.vibrator.cancel();
        }
    }
}
