//! Real-time execution harness for a Tamagotchi P1 CPU core.
//!
//! The crate keeps an opaque instruction-level core running at real-time
//! speed on a host with coarse timers, exposes the hardware-abstraction
//! surface the core calls into, and persists the core's machine state to a
//! small key-value store between sessions.

/// Wall-clock time source and wrapping microsecond timestamps.
pub mod clock;
pub use clock::{is_after, Clock, ManualClock, SystemClock, Timestamp};

/// Half-byte memory model and fixed region map.
pub mod memory;
pub use memory::{
    decode_memory_region, new_memory, MemoryRegion, CELL_MASK, DISPLAY1_END, DISPLAY1_START,
    DISPLAY2_END, DISPLAY2_START, IO_END, IO_START, MEMORY_CELLS, RAM_END, RAM_START,
};

/// Architectural machine state shared with the CPU core.
pub mod state;
pub use state::{
    InterruptSlot, MachineState, StateError, FLAGS_MASK, INDEX_MASK, INT_FACTOR_MASK,
    INT_MASK_MASK, INT_SLOT_NUM, NIBBLE_MASK, NP_MASK, PC_MASK,
};

/// LCD dot matrix and icon strip.
pub mod display;
pub use display::{DisplaySurface, Icon, ICON_NUM, LCD_HEIGHT, LCD_WIDTH};

/// Hardware-abstraction contract and the harness-side bridge.
pub mod hal;
pub use hal::{Hal, HalBridge, LogLevel, NoVibrator, VibePattern, Vibrator};

/// CPU core collaborator contract and button model.
pub mod cpu;
pub use cpu::{Button, ButtonState, CoreError, CpuCore, DEFAULT_CLOCK_RATE_HZ};

/// Recurring interval timers.
pub mod ticker;
pub use ticker::Ticker;

/// Bounded catch-up scheduling of CPU steps.
pub mod scheduler;
pub use scheduler::{CatchUpScheduler, TickOutcome, DEFAULT_MAX_STEPS_PER_TICK};

/// Durable key-value store contract.
pub mod store;
pub use store::{
    DurableStore, MemoryStore, StoreError, StoreKey, StoredValue, ValueKind, MAX_BLOCK_LEN,
};

/// Versioned machine-state snapshot codec.
pub mod snapshot;
pub use snapshot::{
    restore_state, save_state, RestoreOutcome, ScalarField, SnapshotError, SnapshotVersion,
    INTERRUPT_FIELDS_PER_SLOT, IO_BLOCK_START, MEMORY_BLOCK_CELLS, RAM_BLOCK_COUNT,
    SCALAR_FIELDS, SNAPSHOT_KEY_COUNT, VERSION_KEY,
};

/// Host-facing configuration and platform collaborator contracts.
pub mod api;
pub use api::{
    HarnessConfig, InputEvent, NullRenderer, PlatformButton, Renderer,
    DEFAULT_CPU_TICK_INTERVAL_US, DEFAULT_FRAME_RATE_HZ,
};

/// Session-level error taxonomy.
pub mod error;
pub use error::{HarnessError, SessionPhase};

/// Application session lifecycle.
pub mod session;
pub use session::{PollReport, Session};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
