//! Contract for the CPU core collaborator driven by the harness.

use thiserror::Error;

use crate::hal::Hal;
use crate::state::MachineState;

/// Clock rate of the original hardware, in Hz.
pub const DEFAULT_CLOCK_RATE_HZ: u32 = 1_000_000;

/// The three logical buttons on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Button {
    Left,
    Middle,
    Right,
}

/// Electrical state of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum ButtonState {
    Released,
    Pressed,
}

/// Failures a CPU core can report while initializing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The ROM image could not be used.
    #[error("rom image rejected: {0}")]
    InvalidRom(String),
    /// The core could not allocate its working state.
    #[error("core initialization failed: {0}")]
    Init(String),
}

/// Instruction-execution engine of the emulated CPU.
///
/// The harness treats the core as opaque: it initializes it, hands it the HAL
/// once per step, forwards button changes, and reads or rewrites its
/// [`MachineState`] around snapshots.
pub trait CpuCore {
    /// Loads `rom` (12-bit instruction words), optionally seeds the machine
    /// state, and sets the emulated clock rate.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] when the core cannot start from the given image.
    fn init(
        &mut self,
        rom: &[u16],
        state: Option<&MachineState>,
        clock_rate_hz: u32,
    ) -> Result<(), CoreError>;

    /// Executes one unit of emulated work, calling back into `hal` as needed.
    ///
    /// A step always runs to completion.
    fn step(&mut self, hal: &mut dyn Hal);

    /// Current architectural state.
    fn state(&self) -> &MachineState;

    /// Mutable architectural state, used when restoring a snapshot.
    fn state_mut(&mut self) -> &mut MachineState;

    /// Updates the level of one input pin.
    fn set_button(&mut self, button: Button, state: ButtonState);

    /// Frees everything acquired in [`CpuCore::init`].
    fn release(&mut self);
}
