/// Number of interrupt slots in the interrupt controller.
pub const INT_SLOT_NUM: usize = 6;

/// Width mask of the factor-flag register.
pub const INT_FACTOR_MASK: u8 = 0xF;
/// Width mask of the interrupt mask register.
pub const INT_MASK_MASK: u8 = 0xF;

/// One interrupt-controller slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(from = "RawInterruptSlot"))]
pub struct InterruptSlot {
    factor_flag: u8,
    mask: u8,
    triggered: bool,
}

impl InterruptSlot {
    /// Builds a slot, masking each register to its width.
    #[must_use]
    pub const fn new(factor_flag: u8, mask: u8, triggered: bool) -> Self {
        Self {
            factor_flag: factor_flag & INT_FACTOR_MASK,
            mask: mask & INT_MASK_MASK,
            triggered,
        }
    }

    /// Reads the 4-bit factor-flag register.
    #[must_use]
    pub const fn factor_flag(&self) -> u8 {
        self.factor_flag
    }

    /// Writes the factor-flag register.
    pub const fn set_factor_flag(&mut self, value: u8) {
        self.factor_flag = value & INT_FACTOR_MASK;
    }

    /// Reads the 4-bit mask register.
    #[must_use]
    pub const fn mask(&self) -> u8 {
        self.mask
    }

    /// Writes the mask register.
    pub const fn set_mask(&mut self, value: u8) {
        self.mask = value & INT_MASK_MASK;
    }

    /// Returns `true` while the slot has a pending request.
    #[must_use]
    pub const fn triggered(&self) -> bool {
        self.triggered
    }

    /// Sets or clears the pending request.
    pub const fn set_triggered(&mut self, triggered: bool) {
        self.triggered = triggered;
    }
}

/// Unmasked slot registers as they arrive from a deserializer.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawInterruptSlot {
    factor_flag: u8,
    mask: u8,
    triggered: bool,
}

#[cfg(feature = "serde")]
impl From<RawInterruptSlot> for InterruptSlot {
    fn from(raw: RawInterruptSlot) -> Self {
        Self::new(raw.factor_flag, raw.mask, raw.triggered)
    }
}
