//! Dot-matrix and icon buffers written by the HAL bridge and read by renderers.

use std::fmt;

/// Dot-matrix width in pixels.
pub const LCD_WIDTH: usize = 32;
/// Dot-matrix height in pixels.
pub const LCD_HEIGHT: usize = 16;
/// Number of status icons around the dot matrix.
pub const ICON_NUM: usize = 8;

/// Status icons, in the order the CPU core numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Icon {
    Food = 0,
    Light = 1,
    Game = 2,
    Medicine = 3,
    Bathroom = 4,
    Status = 5,
    Discipline = 6,
    Attention = 7,
}

impl Icon {
    /// All icons in index order.
    pub const ALL: [Self; ICON_NUM] = [
        Self::Food,
        Self::Light,
        Self::Game,
        Self::Medicine,
        Self::Bathroom,
        Self::Status,
        Self::Discipline,
        Self::Attention,
    ];

    /// Returns the icon's index in the icon set.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes a raw icon number from the CPU core.
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Food),
            1 => Some(Self::Light),
            2 => Some(Self::Game),
            3 => Some(Self::Medicine),
            4 => Some(Self::Bathroom),
            5 => Some(Self::Status),
            6 => Some(Self::Discipline),
            7 => Some(Self::Attention),
            _ => None,
        }
    }
}

/// Pixel grid plus icon flags, as last written by the CPU core.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DisplaySurface {
    matrix: [[bool; LCD_WIDTH]; LCD_HEIGHT],
    icons: [bool; ICON_NUM],
}

impl DisplaySurface {
    /// Creates a blank surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one pixel. Returns `false` and leaves the surface untouched when
    /// the coordinate is outside the matrix.
    pub fn set_pixel(&mut self, x: usize, y: usize, on: bool) -> bool {
        match self.matrix.get_mut(y).and_then(|row| row.get_mut(x)) {
            Some(cell) => {
                *cell = on;
                true
            }
            None => false,
        }
    }

    /// Reads one pixel; out-of-range coordinates read as off.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.matrix
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(false)
    }

    /// Writes one icon flag. Icons are independent of each other.
    pub const fn set_icon(&mut self, icon: Icon, on: bool) {
        self.icons[icon.index()] = on;
    }

    /// Reads one icon flag.
    #[must_use]
    pub const fn icon(&self, icon: Icon) -> bool {
        self.icons[icon.index()]
    }

    /// Rows of the dot matrix, top to bottom.
    #[must_use]
    pub const fn rows(&self) -> &[[bool; LCD_WIDTH]; LCD_HEIGHT] {
        &self.matrix
    }

    /// Icon flags in [`Icon::ALL`] order.
    #[must_use]
    pub const fn icons(&self) -> &[bool; ICON_NUM] {
        &self.icons
    }

    /// Icons currently lit.
    pub fn lit_icons(&self) -> impl Iterator<Item = Icon> + '_ {
        Icon::ALL.into_iter().filter(|icon| self.icon(*icon))
    }

    /// Packs each matrix row into a `u32`, bit 31 being the leftmost pixel.
    #[must_use]
    pub fn packed_rows(&self) -> [u32; LCD_HEIGHT] {
        let mut packed = [0_u32; LCD_HEIGHT];
        for (word, row) in packed.iter_mut().zip(&self.matrix) {
            *word = row
                .iter()
                .fold(0_u32, |acc, on| (acc << 1) | u32::from(*on));
        }
        packed
    }
}

impl fmt::Display for DisplaySurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.matrix {
            for on in row {
                f.write_str(if *on { "#" } else { "." })?;
            }
            f.write_str("\n")?;
        }
        for (icon, on) in Icon::ALL.iter().zip(self.icons) {
            if on {
                write!(f, "[{icon:?}]")?;
            }
        }
        Ok(())
    }
}
