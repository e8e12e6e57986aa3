//! Half-byte memory model and fixed region map.

/// Fixed memory-region map and address decoder.
pub mod map;

pub use map::{
    decode_memory_region, MemoryRegion, DISPLAY1_END, DISPLAY1_START, DISPLAY2_END,
    DISPLAY2_START, IO_END, IO_START, RAM_END, RAM_START,
};

/// Number of addressable half-byte cells.
pub const MEMORY_CELLS: usize = 4096;

/// Mask applied to every memory cell; each cell holds one nibble.
pub const CELL_MASK: u8 = 0xF;

/// Allocates a zeroed memory image covering the full address space.
#[must_use]
pub fn new_memory() -> Box<[u8]> {
    vec![0; MEMORY_CELLS].into_boxed_slice()
}

#[cfg(test)]
mod tests {
    use super::{new_memory, MEMORY_CELLS};

    #[test]
    fn backing_store_covers_address_space() {
        let memory = new_memory();
        assert_eq!(memory.len(), MEMORY_CELLS);
        assert!(memory.iter().all(|cell| *cell == 0));
    }
}
