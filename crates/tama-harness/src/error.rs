use thiserror::Error;

use crate::cpu::CoreError;
use crate::snapshot::SnapshotError;

/// Session-level failures surfaced to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// The CPU core refused to start.
    #[error("cpu core failed to start")]
    Core(#[from] CoreError),
    /// The final snapshot could not be written.
    #[error("snapshot could not be persisted")]
    Snapshot(#[from] SnapshotError),
    /// The session was driven out of order.
    #[error("session is {actual:?}, expected {expected:?}")]
    Lifecycle {
        /// Phase the operation requires.
        expected: SessionPhase,
        /// Phase the session is in.
        actual: SessionPhase,
    },
}

/// Lifecycle phase of a [`Session`](crate::Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Built but not started.
    Created,
    /// Core initialized; tickers armed.
    Running,
    /// Snapshot written and core released.
    Stopped,
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::{HarnessError, SessionPhase};
    use crate::cpu::CoreError;
    use crate::snapshot::SnapshotError;
    use crate::store::StoreError;

    #[test]
    fn wrapped_errors_keep_their_source() {
        let error = HarnessError::from(CoreError::InvalidRom("empty".to_owned()));
        assert_eq!(error.to_string(), "cpu core failed to start");
        assert_eq!(
            error.source().map(ToString::to_string),
            Some("rom image rejected: empty".to_owned())
        );

        let error = HarnessError::from(SnapshotError::from(StoreError::Missing(3)));
        assert!(error.source().is_some());
    }

    #[test]
    fn lifecycle_error_names_both_phases() {
        let error = HarnessError::Lifecycle {
            expected: SessionPhase::Running,
            actual: SessionPhase::Stopped,
        };
        assert_eq!(error.to_string(), "session is Stopped, expected Running");
    }
}
