//! Versioned key-value encoding of the full machine state.
//!
//! Keys are positional: every entry takes the next key in emission order, so
//! the order of [`SCALAR_FIELDS`], the interrupt table and the memory blocks
//! *is* the format. Any change to that order needs a new
//! [`SnapshotVersion`].
//!
//! | keys      | content                                         |
//! |-----------|-------------------------------------------------|
//! | `0`       | version                                         |
//! | `1..=15`  | scalar registers and timers, see [`SCALAR_FIELDS`] |
//! | `16..=33` | interrupt slots: factor flag, mask, triggered   |
//! | `34..=37` | RAM in 160-cell blocks                          |
//! | `38`      | 160 cells from the I/O base                     |

use std::fmt;

use log::debug;
use thiserror::Error;

use crate::memory::{
    decode_memory_region, MemoryRegion, CELL_MASK, IO_START, MEMORY_CELLS, RAM_START,
};
use crate::state::{
    MachineState, FLAGS_MASK, INDEX_MASK, INT_FACTOR_MASK, INT_MASK_MASK, INT_SLOT_NUM,
    NIBBLE_MASK, NP_MASK, PC_MASK,
};
use crate::store::{DurableStore, StoreError, StoreKey};

/// Stable snapshot format identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u32)]
pub enum SnapshotVersion {
    /// Initial layout.
    V0 = 0,
}

impl SnapshotVersion {
    /// Version written by this build.
    pub const CURRENT: Self = Self::V0;

    /// Converts a stored value to a known version.
    #[must_use]
    pub const fn from_u32(version: u32) -> Option<Self> {
        match version {
            0 => Some(Self::V0),
            _ => None,
        }
    }

    /// Wire value of this version.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Key holding the format version.
pub const VERSION_KEY: StoreKey = 0;

/// Cells per memory block entry.
pub const MEMORY_BLOCK_CELLS: usize = 160;

/// Number of blocks covering RAM.
pub const RAM_BLOCK_COUNT: usize = MemoryRegion::Ram.len() / MEMORY_BLOCK_CELLS;

/// First cell of the I/O block.
pub const IO_BLOCK_START: usize = IO_START as usize;

/// Per-field scalar codec entry.
#[derive(Clone, Copy)]
pub struct ScalarField {
    /// Register or timer name, for diagnostics.
    pub name: &'static str,
    /// Bit-width mask applied on both write and read.
    pub mask: u32,
    get: fn(&MachineState) -> u32,
    set: fn(&mut MachineState, u32),
}

impl fmt::Debug for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarField")
            .field("name", &self.name)
            .field("mask", &format_args!("{:#x}", self.mask))
            .finish_non_exhaustive()
    }
}

/// Scalar fields in emission order.
#[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
pub const SCALAR_FIELDS: [ScalarField; 15] = [
    ScalarField {
        name: "pc",
        mask: PC_MASK as u32,
        get: |s| u32::from(s.pc()),
        set: |s, v| s.set_pc(v as u16),
    },
    ScalarField {
        name: "x",
        mask: INDEX_MASK as u32,
        get: |s| u32::from(s.x()),
        set: |s, v| s.set_x(v as u16),
    },
    ScalarField {
        name: "y",
        mask: INDEX_MASK as u32,
        get: |s| u32::from(s.y()),
        set: |s, v| s.set_y(v as u16),
    },
    ScalarField {
        name: "a",
        mask: NIBBLE_MASK as u32,
        get: |s| u32::from(s.a()),
        set: |s, v| s.set_a(v as u8),
    },
    ScalarField {
        name: "b",
        mask: NIBBLE_MASK as u32,
        get: |s| u32::from(s.b()),
        set: |s, v| s.set_b(v as u8),
    },
    ScalarField {
        name: "np",
        mask: NP_MASK as u32,
        get: |s| u32::from(s.np()),
        set: |s, v| s.set_np(v as u8),
    },
    ScalarField {
        name: "sp",
        mask: 0xFF,
        get: |s| u32::from(s.sp()),
        set: |s, v| s.set_sp(v as u8),
    },
    ScalarField {
        name: "flags",
        mask: FLAGS_MASK as u32,
        get: |s| u32::from(s.flags()),
        set: |s, v| s.set_flags(v as u8),
    },
    ScalarField {
        name: "tick_counter",
        mask: u32::MAX,
        get: MachineState::tick_counter,
        set: MachineState::set_tick_counter,
    },
    ScalarField {
        name: "clk_timer_timestamp",
        mask: u32::MAX,
        get: MachineState::clk_timer_timestamp,
        set: MachineState::set_clk_timer_timestamp,
    },
    ScalarField {
        name: "prog_timer_timestamp",
        mask: u32::MAX,
        get: MachineState::prog_timer_timestamp,
        set: MachineState::set_prog_timer_timestamp,
    },
    ScalarField {
        name: "prog_timer_enabled",
        mask: 0x1,
        get: |s| u32::from(s.prog_timer_enabled()),
        set: |s, v| s.set_prog_timer_enabled(v != 0),
    },
    ScalarField {
        name: "prog_timer_data",
        mask: 0xFF,
        get: |s| u32::from(s.prog_timer_data()),
        set: |s, v| s.set_prog_timer_data(v as u8),
    },
    ScalarField {
        name: "prog_timer_rld",
        mask: 0xFF,
        get: |s| u32::from(s.prog_timer_rld()),
        set: |s, v| s.set_prog_timer_rld(v as u8),
    },
    ScalarField {
        name: "call_depth",
        mask: u32::MAX,
        get: MachineState::call_depth,
        set: MachineState::set_call_depth,
    },
];

/// Integer entries per interrupt slot.
pub const INTERRUPT_FIELDS_PER_SLOT: usize = 3;

/// Total number of keys a snapshot occupies.
#[allow(clippy::cast_possible_truncation)]
pub const SNAPSHOT_KEY_COUNT: StoreKey =
    (1 + SCALAR_FIELDS.len() + INT_SLOT_NUM * INTERRUPT_FIELDS_PER_SLOT + RAM_BLOCK_COUNT + 1)
        as StoreKey;

const _: () = assert_block_layout();

#[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
const fn assert_block_layout() {
    assert!(
        RAM_BLOCK_COUNT * MEMORY_BLOCK_CELLS == MemoryRegion::Ram.len(),
        "ram must split into whole blocks"
    );
    assert!(
        IO_BLOCK_START + MEMORY_BLOCK_CELLS <= MEMORY_CELLS,
        "io block must lie inside memory"
    );
    assert!(
        MEMORY_BLOCK_CELLS <= crate::store::MAX_BLOCK_LEN,
        "memory block must fit in one store entry"
    );

    let mut index = 0;
    while index < RAM_BLOCK_COUNT {
        let first = RAM_START as usize + index * MEMORY_BLOCK_CELLS;
        let last = first + MEMORY_BLOCK_CELLS - 1;
        assert!(
            matches!(decode_memory_region(first as u16), MemoryRegion::Ram)
                && matches!(decode_memory_region(last as u16), MemoryRegion::Ram),
            "ram blocks must stay inside ram"
        );
        index += 1;
    }
    assert!(
        matches!(
            decode_memory_region(IO_BLOCK_START as u16),
            MemoryRegion::Io
        ),
        "io block must start in the io window"
    );
}

/// Result of a restore attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestoreOutcome {
    /// No snapshot is present; state left untouched.
    ColdStart,
    /// A snapshot of another format is present; state left untouched.
    VersionMismatch {
        /// Version found in the store.
        found: u32,
    },
    /// The state was replaced by the stored snapshot.
    Restored,
}

/// Failures while reading or writing a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The durable store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A memory block entry is shorter than a full block.
    #[error(
        "memory block under key {key} holds {len} cells, expected {expected}",
        expected = MEMORY_BLOCK_CELLS
    )]
    ShortBlock {
        /// Key of the block entry.
        key: StoreKey,
        /// Cells actually stored.
        len: usize,
    },
}

/// Hands out keys in emission order.
#[derive(Debug, Default)]
struct KeyCursor {
    next: StoreKey,
}

impl KeyCursor {
    fn take(&mut self) -> StoreKey {
        let key = self.next;
        self.next += 1;
        key
    }
}

fn memory_blocks() -> impl Iterator<Item = usize> {
    (0..RAM_BLOCK_COUNT)
        .map(|index| usize::from(RAM_START) + index * MEMORY_BLOCK_CELLS)
        .chain(std::iter::once(IO_BLOCK_START))
}

/// Writes `state` to `store`, replacing any previous snapshot.
///
/// The version key is removed before any other entry is touched and written
/// back last, so a save that fails midway leaves no version behind and the
/// next restore reports [`RestoreOutcome::ColdStart`] instead of reading a
/// mix of old and new entries.
///
/// # Errors
///
/// Returns [`SnapshotError::Store`] on the first store failure; entries
/// written before the failure are left in place.
pub fn save_state<S>(state: &MachineState, store: &mut S) -> Result<(), SnapshotError>
where
    S: DurableStore + ?Sized,
{
    let mut keys = KeyCursor::default();

    let version_key = keys.take();
    store.delete(version_key)?;

    for field in &SCALAR_FIELDS {
        store.write_int(keys.take(), (field.get)(state) & field.mask)?;
    }

    for slot in state.interrupts() {
        store.write_int(keys.take(), u32::from(slot.factor_flag() & INT_FACTOR_MASK))?;
        store.write_int(keys.take(), u32::from(slot.mask() & INT_MASK_MASK))?;
        store.write_int(keys.take(), u32::from(slot.triggered()))?;
    }

    let mut block = [0_u8; MEMORY_BLOCK_CELLS];
    for start in memory_blocks() {
        let cells = &state.memory()[start..start + MEMORY_BLOCK_CELLS];
        for (out, cell) in block.iter_mut().zip(cells) {
            *out = cell & CELL_MASK;
        }
        store.write_block(keys.take(), &block)?;
    }

    store.write_int(version_key, SnapshotVersion::CURRENT.as_u32())?;

    debug_assert_eq!(keys.next, SNAPSHOT_KEY_COUNT);
    debug!(
        "saved snapshot v{} over {} keys",
        SnapshotVersion::CURRENT.as_u32(),
        keys.next
    );
    Ok(())
}

/// Replaces `state` with the snapshot held in `store`, if a compatible one
/// exists.
///
/// The snapshot is decoded into a scratch copy and only committed once every
/// entry has been read, so `state` is never partially updated.
///
/// # Errors
///
/// Returns [`SnapshotError`] when a compatible snapshot is present but an
/// entry cannot be read; `state` is left untouched.
pub fn restore_state<S>(
    state: &mut MachineState,
    store: &S,
) -> Result<RestoreOutcome, SnapshotError>
where
    S: DurableStore + ?Sized,
{
    let mut keys = KeyCursor::default();

    let version_key = keys.take();
    if !store.exists(version_key) {
        return Ok(RestoreOutcome::ColdStart);
    }
    let found = store.read_int(version_key)?;
    if SnapshotVersion::from_u32(found) != Some(SnapshotVersion::CURRENT) {
        return Ok(RestoreOutcome::VersionMismatch { found });
    }

    let mut staged = state.clone();

    for field in &SCALAR_FIELDS {
        let value = store.read_int(keys.take())? & field.mask;
        (field.set)(&mut staged, value);
    }

    for slot in staged.interrupts_mut() {
        slot.set_factor_flag(masked_nibble(store.read_int(keys.take())?, INT_FACTOR_MASK));
        slot.set_mask(masked_nibble(store.read_int(keys.take())?, INT_MASK_MASK));
        slot.set_triggered(store.read_int(keys.take())? & 0x1 != 0);
    }

    let mut block = [0_u8; MEMORY_BLOCK_CELLS];
    for start in memory_blocks() {
        let key = keys.take();
        let len = store.read_block(key, &mut block)?;
        if len != MEMORY_BLOCK_CELLS {
            return Err(SnapshotError::ShortBlock { key, len });
        }
        staged.load_cells(start, &block);
    }

    *state = staged;
    Ok(RestoreOutcome::Restored)
}

#[allow(clippy::cast_possible_truncation)]
const fn masked_nibble(raw: u32, mask: u8) -> u8 {
    (raw & mask as u32) as u8
}
