//! Architectural machine state of the emulated CPU.

/// Interrupt-controller slot records.
pub mod interrupts;
/// Register file, timers and memory image.
pub mod registers;

pub use interrupts::{InterruptSlot, INT_FACTOR_MASK, INT_MASK_MASK, INT_SLOT_NUM};
pub use registers::{
    MachineState, StateError, FLAGS_MASK, INDEX_MASK, NIBBLE_MASK, NP_MASK, PC_MASK,
};
