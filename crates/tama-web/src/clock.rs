use tama_harness::{Clock, Timestamp};

/// Wall clock backed by `Date.now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebClock;

impl Clock for WebClock {
    fn now(&self) -> Timestamp {
        timestamp_from_millis(js_sys::Date::now())
    }
}

/// Converts epoch milliseconds to a wrapping microsecond timestamp.
///
/// Only millisecond resolution is available, so the low three decimal digits
/// of the result are always zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn timestamp_from_millis(millis: f64) -> Timestamp {
    let millis = if millis.is_finite() && millis > 0.0 {
        millis as u64
    } else {
        0
    };
    millis.wrapping_mul(1_000) as Timestamp
}
