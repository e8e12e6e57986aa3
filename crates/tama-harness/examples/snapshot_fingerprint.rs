//! Snapshot fingerprint generator used for cross-host format comparison.
//!
//! Saves a fixed machine state and hashes every store entry in key order, so
//! any change to the persisted layout shows up as a different fingerprint.

use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use tama_harness::{
    save_state, InterruptSlot, MachineState, MemoryStore, StoredValue, IO_START, RAM_END,
};
use thiserror as _;

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn sample_state() -> MachineState {
    let mut state = MachineState::default();
    state.set_pc(0x0100);
    state.set_x(0x0ABC);
    state.set_y(0x0123);
    state.set_a(0x5);
    state.set_b(0xA);
    state.set_np(0x01);
    state.set_sp(0xC0);
    state.set_flags(0x9);
    state.set_tick_counter(123_456);
    state.set_clk_timer_timestamp(0x1234_5678);
    state.set_prog_timer_timestamp(0x0BAD_F00D);
    state.set_prog_timer_enabled(true);
    state.set_prog_timer_data(0x42);
    state.set_prog_timer_rld(0x24);
    state.set_call_depth(3);
    state.interrupts_mut()[2] = InterruptSlot::new(0x3, 0x5, true);

    for addr in (0..=RAM_END).step_by(7) {
        state.write_cell(addr, u8::try_from(addr % 16).expect("nibble fits in u8"));
    }
    state.write_cell(IO_START + 0x10, 0xC);
    state
}

fn fingerprint() -> String {
    let mut store = MemoryStore::new();
    save_state(&sample_state(), &mut store).expect("saving into memory store should succeed");

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for (key, value) in store.iter() {
        hash_bytes(&mut hash, &key.to_le_bytes());
        match value {
            StoredValue::Int(value) => {
                hash_bytes(&mut hash, &[0x01]);
                hash_bytes(&mut hash, &value.to_le_bytes());
            }
            StoredValue::Block(bytes) => {
                hash_bytes(&mut hash, &[0x02]);
                hash_bytes(&mut hash, bytes);
            }
        }
    }

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
