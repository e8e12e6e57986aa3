#![no_main]

use libfuzzer_sys::fuzz_target;
use tama_harness::{
    restore_state, save_state, DurableStore, MachineState, MemoryStore, RestoreOutcome,
    MAX_BLOCK_LEN, SNAPSHOT_KEY_COUNT,
};

// Each record is `key, tag, len, payload...`: tag bit 0 selects an integer
// (four little-endian payload bytes) or a block (`len` payload bytes).
fn store_from_bytes(data: &[u8]) -> MemoryStore {
    let mut store = MemoryStore::new();
    let mut rest = data;
    while let [key, tag, len, tail @ ..] = rest {
        let key = u32::from(*key) % (SNAPSHOT_KEY_COUNT + 2);
        if tag & 1 == 0 {
            let Some((word, tail)) = tail.split_first_chunk::<4>() else {
                break;
            };
            let _ = store.write_int(key, u32::from_le_bytes(*word));
            rest = tail;
        } else {
            let len = usize::from(*len).min(tail.len()).min(MAX_BLOCK_LEN);
            let _ = store.write_block(key, &tail[..len]);
            rest = &tail[len..];
        }
    }
    store
}

fuzz_target!(|data: &[u8]| {
    let store = store_from_bytes(data);

    let mut state = MachineState::default();
    state.set_pc(0x0155);
    let before = state.clone();

    match restore_state(&mut state, &store) {
        Ok(RestoreOutcome::Restored) => {
            assert!(state.memory().iter().all(|cell| *cell <= 0xF));

            let mut resaved = MemoryStore::new();
            save_state(&state, &mut resaved).expect("memory store accepts snapshots");
            let mut again = MachineState::default();
            assert_eq!(
                restore_state(&mut again, &resaved),
                Ok(RestoreOutcome::Restored)
            );
            assert_eq!(again, state);
        }
        Ok(RestoreOutcome::ColdStart | RestoreOutcome::VersionMismatch { .. }) | Err(_) => {
            assert_eq!(state, before);
        }
    }
});
