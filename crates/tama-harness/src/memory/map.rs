//! Fixed memory map of the emulated E0C6S46 address space.

/// Inclusive start address of general RAM.
pub const RAM_START: u16 = 0x000;
/// Inclusive end address of general RAM.
pub const RAM_END: u16 = 0x27F;
/// Inclusive start address of the first display RAM bank.
pub const DISPLAY1_START: u16 = 0xE00;
/// Inclusive end address of the first display RAM bank.
pub const DISPLAY1_END: u16 = 0xE4F;
/// Inclusive start address of the second display RAM bank.
pub const DISPLAY2_START: u16 = 0xE80;
/// Inclusive end address of the second display RAM bank.
pub const DISPLAY2_END: u16 = 0xECF;
/// Inclusive start address of the memory-mapped I/O registers.
pub const IO_START: u16 = 0xF00;
/// Inclusive end address of the memory-mapped I/O registers.
pub const IO_END: u16 = 0xF7F;

/// Region classification for memory cell addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryRegion {
    /// General RAM (`0x000..=0x27F`).
    Ram,
    /// Display RAM, first bank (`0xE00..=0xE4F`).
    Display1,
    /// Display RAM, second bank (`0xE80..=0xECF`).
    Display2,
    /// Memory-mapped I/O (`0xF00..=0xF7F`).
    Io,
    /// Any address with nothing wired behind it.
    Unmapped,
}

impl MemoryRegion {
    /// Returns the inclusive bounds for a mapped region.
    #[must_use]
    pub const fn bounds(self) -> Option<(u16, u16)> {
        match self {
            Self::Ram => Some((RAM_START, RAM_END)),
            Self::Display1 => Some((DISPLAY1_START, DISPLAY1_END)),
            Self::Display2 => Some((DISPLAY2_START, DISPLAY2_END)),
            Self::Io => Some((IO_START, IO_END)),
            Self::Unmapped => None,
        }
    }

    /// Number of half-byte cells in a mapped region.
    #[must_use]
    pub const fn len(self) -> usize {
        match self.bounds() {
            Some((start, end)) => (end - start) as usize + 1,
            None => 0,
        }
    }

    /// Returns `true` for [`MemoryRegion::Unmapped`].
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }
}

const _: () = assert_memory_layout();

const fn assert_memory_layout() {
    assert!(RAM_START <= RAM_END, "ram bounds are inverted");
    assert!(RAM_END < DISPLAY1_START, "ram overlaps display ram");
    assert!(DISPLAY1_END < DISPLAY2_START, "display banks overlap");
    assert!(DISPLAY2_END < IO_START, "display ram overlaps io");
    assert!(
        (IO_END as usize) < super::MEMORY_CELLS,
        "io window exceeds address space"
    );
}

/// Decodes a memory cell address into its region.
#[must_use]
pub const fn decode_memory_region(addr: u16) -> MemoryRegion {
    match addr {
        RAM_START..=RAM_END => MemoryRegion::Ram,
        DISPLAY1_START..=DISPLAY1_END => MemoryRegion::Display1,
        DISPLAY2_START..=DISPLAY2_END => MemoryRegion::Display2,
        IO_START..=IO_END => MemoryRegion::Io,
        _ => MemoryRegion::Unmapped,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_memory_region, MemoryRegion, DISPLAY1_END, DISPLAY1_START, DISPLAY2_END,
        DISPLAY2_START, IO_END, IO_START, RAM_END, RAM_START,
    };

    #[test]
    fn region_decode_is_correct_at_boundaries() {
        assert_eq!(decode_memory_region(RAM_START), MemoryRegion::Ram);
        assert_eq!(decode_memory_region(RAM_END), MemoryRegion::Ram);
        assert_eq!(decode_memory_region(RAM_END + 1), MemoryRegion::Unmapped);

        assert_eq!(decode_memory_region(DISPLAY1_START), MemoryRegion::Display1);
        assert_eq!(decode_memory_region(DISPLAY1_END), MemoryRegion::Display1);
        assert_eq!(decode_memory_region(DISPLAY2_START), MemoryRegion::Display2);
        assert_eq!(decode_memory_region(DISPLAY2_END), MemoryRegion::Display2);

        assert_eq!(decode_memory_region(IO_START), MemoryRegion::Io);
        assert_eq!(decode_memory_region(IO_END), MemoryRegion::Io);
        assert_eq!(decode_memory_region(IO_END + 1), MemoryRegion::Unmapped);
    }

    #[test]
    fn region_sizes_match_hardware() {
        assert_eq!(MemoryRegion::Ram.len(), 640);
        assert_eq!(MemoryRegion::Display1.len(), 80);
        assert_eq!(MemoryRegion::Display2.len(), 80);
        assert_eq!(MemoryRegion::Io.len(), 128);
        assert!(MemoryRegion::Unmapped.is_empty());
    }

    #[test]
    fn bounds_agree_with_decoder() {
        for region in [
            MemoryRegion::Ram,
            MemoryRegion::Display1,
            MemoryRegion::Display2,
            MemoryRegion::Io,
        ] {
            let (start, end) = region.bounds().expect("mapped region has bounds");
            assert_eq!(decode_memory_region(start), region);
            assert_eq!(decode_memory_region(end), region);
        }
    }
}
