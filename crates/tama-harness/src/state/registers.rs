use thiserror::Error;

use crate::memory::{new_memory, CELL_MASK, MEMORY_CELLS};

use super::interrupts::{InterruptSlot, INT_SLOT_NUM};

/// Width mask of the 13-bit program counter.
pub const PC_MASK: u16 = 0x1FFF;
/// Width mask of the 12-bit `X` and `Y` index registers.
pub const INDEX_MASK: u16 = 0xFFF;
/// Width mask of the 4-bit `A`/`B` accumulators.
pub const NIBBLE_MASK: u8 = 0xF;
/// Width mask of the 5-bit `NP` page register.
pub const NP_MASK: u8 = 0x1F;
/// Width mask of the 4-bit `FLAGS` register.
pub const FLAGS_MASK: u8 = 0xF;

/// Rejections when building a [`MachineState`] from unchecked parts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The memory image does not cover the full address space.
    #[error("memory image holds {len} cells, expected {expected}", expected = MEMORY_CELLS)]
    MemoryLength {
        /// Cells actually supplied.
        len: usize,
    },
}

/// Complete architectural state of the E0C6S46 core.
///
/// Every setter masks its value to the register width, so a state built
/// through this API always satisfies the width invariant the snapshot codec
/// relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawMachineState"))]
pub struct MachineState {
    pc: u16,
    x: u16,
    y: u16,
    a: u8,
    b: u8,
    np: u8,
    sp: u8,
    flags: u8,
    tick_counter: u32,
    clk_timer_timestamp: u32,
    prog_timer_timestamp: u32,
    prog_timer_enabled: bool,
    prog_timer_data: u8,
    prog_timer_rld: u8,
    call_depth: u32,
    interrupts: [InterruptSlot; INT_SLOT_NUM],
    memory: Box<[u8]>,
}

impl Default for MachineState {
    fn default() -> Self {
        Self {
            pc: 0,
            x: 0,
            y: 0,
            a: 0,
            b: 0,
            np: 0,
            sp: 0,
            flags: 0,
            tick_counter: 0,
            clk_timer_timestamp: 0,
            prog_timer_timestamp: 0,
            prog_timer_enabled: false,
            prog_timer_data: 0,
            prog_timer_rld: 0,
            call_depth: 0,
            interrupts: [InterruptSlot::default(); INT_SLOT_NUM],
            memory: new_memory(),
        }
    }
}

impl MachineState {
    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, value: u16) {
        self.pc = value & PC_MASK;
    }

    /// Reads the `X` index register.
    #[must_use]
    pub const fn x(&self) -> u16 {
        self.x
    }

    /// Writes the `X` index register.
    pub const fn set_x(&mut self, value: u16) {
        self.x = value & INDEX_MASK;
    }

    /// Reads the `Y` index register.
    #[must_use]
    pub const fn y(&self) -> u16 {
        self.y
    }

    /// Writes the `Y` index register.
    pub const fn set_y(&mut self, value: u16) {
        self.y = value & INDEX_MASK;
    }

    /// Reads accumulator `A`.
    #[must_use]
    pub const fn a(&self) -> u8 {
        self.a
    }

    /// Writes accumulator `A`.
    pub const fn set_a(&mut self, value: u8) {
        self.a = value & NIBBLE_MASK;
    }

    /// Reads accumulator `B`.
    #[must_use]
    pub const fn b(&self) -> u8 {
        self.b
    }

    /// Writes accumulator `B`.
    pub const fn set_b(&mut self, value: u8) {
        self.b = value & NIBBLE_MASK;
    }

    /// Reads the `NP` page register.
    #[must_use]
    pub const fn np(&self) -> u8 {
        self.np
    }

    /// Writes the `NP` page register.
    pub const fn set_np(&mut self, value: u8) {
        self.np = value & NP_MASK;
    }

    /// Reads the stack pointer.
    #[must_use]
    pub const fn sp(&self) -> u8 {
        self.sp
    }

    /// Writes the stack pointer.
    pub const fn set_sp(&mut self, value: u8) {
        self.sp = value;
    }

    /// Reads the `FLAGS` register.
    #[must_use]
    pub const fn flags(&self) -> u8 {
        self.flags
    }

    /// Writes the `FLAGS` register.
    pub const fn set_flags(&mut self, value: u8) {
        self.flags = value & FLAGS_MASK;
    }

    /// Reads the free-running tick counter.
    #[must_use]
    pub const fn tick_counter(&self) -> u32 {
        self.tick_counter
    }

    /// Writes the free-running tick counter.
    pub const fn set_tick_counter(&mut self, value: u32) {
        self.tick_counter = value;
    }

    /// Reads the clock-timer reference timestamp.
    #[must_use]
    pub const fn clk_timer_timestamp(&self) -> u32 {
        self.clk_timer_timestamp
    }

    /// Writes the clock-timer reference timestamp.
    pub const fn set_clk_timer_timestamp(&mut self, value: u32) {
        self.clk_timer_timestamp = value;
    }

    /// Reads the programmable-timer reference timestamp.
    #[must_use]
    pub const fn prog_timer_timestamp(&self) -> u32 {
        self.prog_timer_timestamp
    }

    /// Writes the programmable-timer reference timestamp.
    pub const fn set_prog_timer_timestamp(&mut self, value: u32) {
        self.prog_timer_timestamp = value;
    }

    /// Returns `true` while the programmable timer runs.
    #[must_use]
    pub const fn prog_timer_enabled(&self) -> bool {
        self.prog_timer_enabled
    }

    /// Starts or stops the programmable timer.
    pub const fn set_prog_timer_enabled(&mut self, enabled: bool) {
        self.prog_timer_enabled = enabled;
    }

    /// Reads the programmable-timer down-counter.
    #[must_use]
    pub const fn prog_timer_data(&self) -> u8 {
        self.prog_timer_data
    }

    /// Writes the programmable-timer down-counter.
    pub const fn set_prog_timer_data(&mut self, value: u8) {
        self.prog_timer_data = value;
    }

    /// Reads the programmable-timer reload value.
    #[must_use]
    pub const fn prog_timer_rld(&self) -> u8 {
        self.prog_timer_rld
    }

    /// Writes the programmable-timer reload value.
    pub const fn set_prog_timer_rld(&mut self, value: u8) {
        self.prog_timer_rld = value;
    }

    /// Reads the subroutine call depth.
    #[must_use]
    pub const fn call_depth(&self) -> u32 {
        self.call_depth
    }

    /// Writes the subroutine call depth.
    pub const fn set_call_depth(&mut self, value: u32) {
        self.call_depth = value;
    }

    /// Interrupt slots in priority-table order.
    #[must_use]
    pub const fn interrupts(&self) -> &[InterruptSlot; INT_SLOT_NUM] {
        &self.interrupts
    }

    /// Mutable access to the interrupt slots; slot setters keep the masks.
    pub const fn interrupts_mut(&mut self) -> &mut [InterruptSlot; INT_SLOT_NUM] {
        &mut self.interrupts
    }

    /// The full memory image, one nibble per cell.
    #[must_use]
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Reads one memory cell; out-of-range addresses read as zero.
    #[must_use]
    pub fn read_cell(&self, addr: u16) -> u8 {
        self.memory.get(usize::from(addr)).copied().unwrap_or(0)
    }

    /// Writes one memory cell, masked to a nibble. Out-of-range writes are
    /// dropped.
    pub fn write_cell(&mut self, addr: u16, value: u8) {
        if let Some(cell) = self.memory.get_mut(usize::from(addr)) {
            *cell = value & CELL_MASK;
        }
    }

    /// Copies `cells` into memory starting at `start`, masking each nibble.
    /// Cells that would land past the end of memory are dropped.
    pub fn load_cells(&mut self, start: usize, cells: &[u8]) {
        let Some(window) = self.memory.get_mut(start..) else {
            return;
        };
        for (cell, value) in window.iter_mut().zip(cells) {
            *cell = value & CELL_MASK;
        }
    }
}

/// Field-for-field image of [`MachineState`] as it arrives from a
/// deserializer, before any width checks.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawMachineState {
    pc: u16,
    x: u16,
    y: u16,
    a: u8,
    b: u8,
    np: u8,
    sp: u8,
    flags: u8,
    tick_counter: u32,
    clk_timer_timestamp: u32,
    prog_timer_timestamp: u32,
    prog_timer_enabled: bool,
    prog_timer_data: u8,
    prog_timer_rld: u8,
    call_depth: u32,
    interrupts: [InterruptSlot; INT_SLOT_NUM],
    memory: Vec<u8>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawMachineState> for MachineState {
    type Error = StateError;

    fn try_from(raw: RawMachineState) -> Result<Self, Self::Error> {
        if raw.memory.len() != MEMORY_CELLS {
            return Err(StateError::MemoryLength {
                len: raw.memory.len(),
            });
        }

        let mut state = Self::default();
        state.set_pc(raw.pc);
        state.set_x(raw.x);
        state.set_y(raw.y);
        state.set_a(raw.a);
        state.set_b(raw.b);
        state.set_np(raw.np);
        state.set_sp(raw.sp);
        state.set_flags(raw.flags);
        state.set_tick_counter(raw.tick_counter);
        state.set_clk_timer_timestamp(raw.clk_timer_timestamp);
        state.set_prog_timer_timestamp(raw.prog_timer_timestamp);
        state.set_prog_timer_enabled(raw.prog_timer_enabled);
        state.set_prog_timer_data(raw.prog_timer_data);
        state.set_prog_timer_rld(raw.prog_timer_rld);
        state.set_call_depth(raw.call_depth);
        state.interrupts = raw.interrupts;
        state.load_cells(0, &raw.memory);
        Ok(state)
    }
}
