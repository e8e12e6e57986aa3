//! Snapshot codec integration coverage over the in-memory store.

use log as _;
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use tama_harness::{
    restore_state, save_state, DurableStore, InterruptSlot, MachineState, MemoryStore,
    RestoreOutcome, SnapshotError, StoreError, StoredValue, DISPLAY1_START, INT_SLOT_NUM,
    IO_BLOCK_START, MEMORY_BLOCK_CELLS, RAM_BLOCK_COUNT, SNAPSHOT_KEY_COUNT, VERSION_KEY,
};
use thiserror as _;

const PERSISTED_CELLS: usize = (RAM_BLOCK_COUNT + 1) * MEMORY_BLOCK_CELLS;

fn persisted_addr(index: usize) -> u16 {
    let ram_cells = RAM_BLOCK_COUNT * MEMORY_BLOCK_CELLS;
    let addr = if index < ram_cells {
        index
    } else {
        IO_BLOCK_START + (index - ram_cells)
    };
    u16::try_from(addr).expect("persisted address fits in u16")
}

#[derive(Debug, Clone)]
struct Scalars {
    pc: u16,
    x: u16,
    y: u16,
    nibbles: [u8; 4],
    counters: [u32; 4],
    prog_timer: (bool, u8, u8),
}

fn scalars() -> impl Strategy<Value = Scalars> {
    (
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        any::<[u8; 4]>(),
        any::<[u32; 4]>(),
        (any::<bool>(), any::<u8>(), any::<u8>()),
    )
        .prop_map(|(pc, x, y, nibbles, counters, prog_timer)| Scalars {
            pc,
            x,
            y,
            nibbles,
            counters,
            prog_timer,
        })
}

fn build_state(
    scalars: &Scalars,
    sp: u8,
    slots: &[(u8, u8, bool)],
    cells: &[u8],
) -> MachineState {
    let mut state = MachineState::default();
    state.set_pc(scalars.pc);
    state.set_x(scalars.x);
    state.set_y(scalars.y);
    state.set_a(scalars.nibbles[0]);
    state.set_b(scalars.nibbles[1]);
    state.set_np(scalars.nibbles[2]);
    state.set_flags(scalars.nibbles[3]);
    state.set_sp(sp);
    state.set_tick_counter(scalars.counters[0]);
    state.set_clk_timer_timestamp(scalars.counters[1]);
    state.set_prog_timer_timestamp(scalars.counters[2]);
    state.set_call_depth(scalars.counters[3]);
    state.set_prog_timer_enabled(scalars.prog_timer.0);
    state.set_prog_timer_data(scalars.prog_timer.1);
    state.set_prog_timer_rld(scalars.prog_timer.2);

    for (slot, &(factor, mask, triggered)) in state.interrupts_mut().iter_mut().zip(slots) {
        *slot = InterruptSlot::new(factor, mask, triggered);
    }
    for (index, &cell) in cells.iter().enumerate() {
        state.write_cell(persisted_addr(index), cell);
    }
    state
}

proptest! {
    #[test]
    fn property_save_then_restore_reproduces_persisted_state(
        scalars in scalars(),
        sp in any::<u8>(),
        slots in proptest::collection::vec(any::<(u8, u8, bool)>(), INT_SLOT_NUM),
        cells in proptest::collection::vec(0_u8..16, PERSISTED_CELLS),
    ) {
        let original = build_state(&scalars, sp, &slots, &cells);
        let mut store = MemoryStore::new();
        save_state(&original, &mut store).expect("save");

        let mut restored = MachineState::default();
        prop_assert_eq!(restore_state(&mut restored, &store), Ok(RestoreOutcome::Restored));
        prop_assert_eq!(restored, original);
    }

    #[test]
    fn property_single_cell_change_touches_only_its_block(
        index in 0..PERSISTED_CELLS,
        value in 1_u8..16,
    ) {
        let mut before = MemoryStore::new();
        save_state(&MachineState::default(), &mut before).expect("save");

        let mut state = MachineState::default();
        state.write_cell(persisted_addr(index), value);
        let mut after = MemoryStore::new();
        save_state(&state, &mut after).expect("save");

        let block_count = u32::try_from(RAM_BLOCK_COUNT + 1).expect("block count fits");
        let block_index = u32::try_from(index / MEMORY_BLOCK_CELLS).expect("block index fits");
        let changed_key = SNAPSHOT_KEY_COUNT - block_count + block_index;
        for key in 0..SNAPSHOT_KEY_COUNT {
            if key == changed_key {
                prop_assert_ne!(before.get(key), after.get(key));
            } else {
                prop_assert_eq!(before.get(key), after.get(key));
            }
        }
    }
}

#[test]
fn restore_from_empty_store_is_idempotent_cold_start() {
    let store = MemoryStore::new();
    let mut state = MachineState::default();
    state.set_pc(0x0777);
    let untouched = state.clone();

    for _ in 0..2 {
        assert_eq!(restore_state(&mut state, &store), Ok(RestoreOutcome::ColdStart));
        assert_eq!(state, untouched);
    }
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(u32::MAX)]
fn foreign_version_leaves_state_untouched(#[case] version: u32) {
    let mut store = MemoryStore::new();
    save_state(&MachineState::default(), &mut store).expect("save");
    store.write_int(VERSION_KEY, version).expect("overwrite version");

    let mut state = MachineState::default();
    state.set_x(0x0ABC);
    let untouched = state.clone();

    assert_eq!(
        restore_state(&mut state, &store),
        Ok(RestoreOutcome::VersionMismatch { found: version })
    );
    assert_eq!(state, untouched);
}

#[test]
fn saving_twice_is_stable() {
    let mut state = MachineState::default();
    state.set_tick_counter(0xDEAD_BEEF);
    state.write_cell(0x10, 0x9);

    let mut first = MemoryStore::new();
    save_state(&state, &mut first).expect("save");
    let mut second = first.clone();
    save_state(&state, &mut second).expect("save");

    assert_eq!(first, second);
    assert_eq!(second.len(), usize::try_from(SNAPSHOT_KEY_COUNT).expect("key count fits"));
}

#[test]
fn display_memory_is_not_persisted() {
    let mut state = MachineState::default();
    state.write_cell(DISPLAY1_START, 0xF);

    let mut store = MemoryStore::new();
    save_state(&state, &mut store).expect("save");

    let mut restored = MachineState::default();
    restore_state(&mut restored, &store).expect("restore");
    assert_eq!(restored.read_cell(DISPLAY1_START), 0);
}

#[test]
fn wrong_entry_kind_aborts_restore() {
    let mut store = MemoryStore::new();
    save_state(&MachineState::default(), &mut store).expect("save");
    store.write_block(3, &[1, 2]).expect("clobber scalar");

    let mut state = MachineState::default();
    assert!(matches!(
        restore_state(&mut state, &store),
        Err(SnapshotError::Store(StoreError::KindMismatch { key: 3, .. }))
    ));
}

#[test]
fn out_of_range_stored_values_are_masked_on_restore() {
    let mut store = MemoryStore::new();
    save_state(&MachineState::default(), &mut store).expect("save");
    store.write_int(1, u32::MAX).expect("pc");
    store.write_int(4, u32::MAX).expect("a");
    store.write_block(34, &[0xFF; MEMORY_BLOCK_CELLS]).expect("ram block");

    let mut state = MachineState::default();
    restore_state(&mut state, &store).expect("restore");

    assert_eq!(state.pc(), 0x1FFF);
    assert_eq!(state.a(), 0xF);
    assert_eq!(state.read_cell(0), 0xF);
    assert!(matches!(store.get(34), Some(StoredValue::Block(_))));
}
