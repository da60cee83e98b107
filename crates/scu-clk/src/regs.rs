//! SCU register map and access abstraction.
//!
//! All accesses are aligned 32-bit reads/writes at byte offsets from the SCU
//! base. Several control words come as set/clear pairs: writing a 1 to the
//! base register sets the bit, writing a 1 to base + 4 clears it, and reading
//! the base register returns the current state.
//!
//! ```text
//! 0x040 / 0x044   reset control 1   set / clear   (lines  0..31)
//! 0x050 / 0x054   reset control 2   set / clear   (lines 32..63)
//! 0x080 / 0x084   clock stop 1      set / clear   (gates  0..31)
//! 0x090 / 0x094   clock stop 2      set / clear   (gates 32..63)
//! ```

#![allow(clippy::arithmetic_side_effects)] // bit-field math on 32-bit words

use core::fmt;

// ── Register offsets ─────────────────────────────────────────────────────────

/// Silicon revision (bits \[23:16\] non-zero on A1 and later).
pub const SILICON_REV: u32 = 0x004;
/// Reset control, bank 0 (write-one-to-set, reads state).
pub const RESET_CTRL: u32 = 0x040;
/// Reset control, bank 1 (write-one-to-set, reads state).
pub const RESET_CTRL2: u32 = 0x050;
/// Clock stop control, bank 0 (write-one-to-set, reads state).
pub const CLK_STOP_CTRL: u32 = 0x080;
/// Clock stop control, bank 1 (write-one-to-set, reads state).
pub const CLK_STOP_CTRL2: u32 = 0x090;
/// Offset of the write-one-to-clear partner of a set/clear pair.
pub const CLEAR_OFFSET: u32 = 0x04;
/// Miscellaneous control (UART5 ÷13 enable).
pub const MISC_CTRL: u32 = 0x0C0;

/// HPLL parameter word.
pub const HPLL_PARAM: u32 = 0x200;
/// APLL parameter word.
pub const APLL_PARAM: u32 = 0x210;
/// MPLL parameter word.
pub const MPLL_PARAM: u32 = 0x220;
/// EPLL parameter word.
pub const EPLL_PARAM: u32 = 0x240;
/// DPLL parameter word.
pub const DPLL_PARAM: u32 = 0x260;

/// Clock selection 1.
pub const CLK_SELECTION1: u32 = 0x300;
/// Clock selection 2.
pub const CLK_SELECTION2: u32 = 0x304;
/// Clock selection 3 (display divider).
pub const CLK_SELECTION3: u32 = 0x308;
/// Clock selection 4.
pub const CLK_SELECTION4: u32 = 0x310;
/// Clock selection 5.
pub const CLK_SELECTION5: u32 = 0x314;

/// UART-X fractional divider (`uxclk`).
pub const UXCLK_CTRL: u32 = 0x338;
/// High-speed UART-X fractional divider (`huxclk`).
pub const HUXCLK_CTRL: u32 = 0x33C;

/// MAC1/2 clock control 0 (1 Gbit delay + RGMII source / pad direction).
pub const MAC12_CLK_CTRL0: u32 = 0x340;
/// MAC1/2 clock control 1 (100 Mbit delay).
pub const MAC12_CLK_CTRL1: u32 = 0x348;
/// MAC1/2 clock control 2 (10 Mbit delay).
pub const MAC12_CLK_CTRL2: u32 = 0x34C;
/// MAC3/4 clock control 0 (1 Gbit delay).
pub const MAC34_CLK_CTRL0: u32 = 0x350;
/// MAC3/4 clock control 1 (100 Mbit delay).
pub const MAC34_CLK_CTRL1: u32 = 0x358;
/// MAC3/4 clock control 2 (10 Mbit delay).
pub const MAC34_CLK_CTRL2: u32 = 0x35C;
/// MAC3/4 pad driving strength.
pub const MAC34_DRIVING_CTRL: u32 = 0x458;

/// Hardware strap 1.
pub const HW_STRAP1: u32 = 0x500;

// ── Access trait ─────────────────────────────────────────────────────────────

/// Aligned 32-bit access to the SCU register block.
///
/// Methods take `&self`: the register block is shared hardware, and every
/// read-modify-write is serialized by the owning
/// [`ClockController`](crate::ClockController) lock, not by the backend.
pub trait RegisterMap {
    /// Backend error type (bus fault, regmap failure, ...).
    type Error: core::fmt::Debug;

    /// Read the 32-bit word at `offset`.
    fn read(&self, offset: u32) -> Result<u32, Self::Error>;

    /// Write the 32-bit word at `offset`.
    fn write(&self, offset: u32, value: u32) -> Result<(), Self::Error>;

    /// Replace the bits selected by `mask` with the corresponding bits of `value`.
    fn update_bits(&self, offset: u32, mask: u32, value: u32) -> Result<(), Self::Error> {
        let current = self.read(offset)?;
        self.write(offset, (current & !mask) | (value & mask))
    }
}

impl<T: RegisterMap + ?Sized> RegisterMap for &T {
    type Error = T::Error;

    fn read(&self, offset: u32) -> Result<u32, Self::Error> {
        (**self).read(offset)
    }

    fn write(&self, offset: u32, value: u32) -> Result<(), Self::Error> {
        (**self).write(offset, value)
    }

    fn update_bits(&self, offset: u32, mask: u32, value: u32) -> Result<(), Self::Error> {
        (**self).update_bits(offset, mask, value)
    }
}

/// Length in bytes of the mapped SCU block.
pub const SCU_BLOCK_LEN: u32 = 0x1000;

/// Memory-mapped SCU backend.
///
/// Accesses themselves cannot fail; offsets outside the block or off a word
/// boundary are refused before any pointer is formed.
pub struct MmioScu {
    base: *mut u32,
}

/// Rejected MMIO offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MmioError {
    /// Offset at or past [`SCU_BLOCK_LEN`].
    OutOfRange(u32),
    /// Offset not a multiple of 4.
    Misaligned(u32),
}

impl fmt::Display for MmioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange(offset) => write!(f, "SCU offset {offset:#x} outside the register block"),
            Self::Misaligned(offset) => write!(f, "SCU offset {offset:#x} is not word aligned"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MmioError {}

impl MmioScu {
    /// Wrap the SCU register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point to the start of the mapped SCU block (at least
    /// [`SCU_BLOCK_LEN`] bytes, 4-byte aligned), valid for volatile access for
    /// the lifetime of the returned value, and no other code may write the SCU
    /// clock/reset registers except through this handle.
    pub const unsafe fn new(base: *mut u32) -> Self {
        Self { base }
    }

    fn word(&self, offset: u32) -> Result<*mut u32, MmioError> {
        if offset >= SCU_BLOCK_LEN {
            return Err(MmioError::OutOfRange(offset));
        }
        if offset % 4 != 0 {
            return Err(MmioError::Misaligned(offset));
        }
        let index = usize::try_from(offset / 4).map_err(|_| MmioError::OutOfRange(offset))?;
        Ok(self.base.wrapping_add(index))
    }
}

// SAFETY: the SCU block is a fixed hardware resource; `MmioScu::new` requires
// exclusive ownership of it, and concurrent access is serialized by the
// controller lock.
unsafe impl Send for MmioScu {}
// SAFETY: see above.
unsafe impl Sync for MmioScu {}

impl RegisterMap for MmioScu {
    type Error = MmioError;

    fn read(&self, offset: u32) -> Result<u32, Self::Error> {
        let word = self.word(offset)?;
        // SAFETY: `word` is inside the block `new` guarantees mapped and aligned.
        Ok(unsafe { core::ptr::read_volatile(word) })
    }

    fn write(&self, offset: u32, value: u32) -> Result<(), Self::Error> {
        let word = self.word(offset)?;
        // SAFETY: `word` is inside the block `new` guarantees mapped and aligned.
        unsafe { core::ptr::write_volatile(word, value) };
        Ok(())
    }
}

// ── Bank addressing ──────────────────────────────────────────────────────────

/// One bit of a two-bank (2 × 32) control register pair.
///
/// Index 0–31 lives in bank 0, 32–63 in bank 1. Used for clock-stop bits and
/// reset lines alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BankBit(u8);

impl BankBit {
    /// Number of addressable bits across both banks.
    pub const COUNT: u8 = 64;

    /// Address bit `index`, or `None` if `index >= 64`.
    pub const fn new(index: u8) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Flat index 0–63.
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Bank number, 0 or 1.
    pub const fn bank(self) -> u8 {
        self.0 / 32
    }

    /// Bit position within the bank.
    pub const fn bit(self) -> u8 {
        self.0 % 32
    }

    /// Single-bit mask within the bank's 32-bit word.
    pub const fn mask(self) -> u32 {
        1 << self.bit()
    }

    /// Pick the set register of the bank from a `(bank 0, bank 1)` pair.
    pub const fn set_register(self, bank0: u32, bank1: u32) -> u32 {
        if self.bank() == 0 {
            bank0
        } else {
            bank1
        }
    }

    /// The write-one-to-clear register paired with [`set_register`](Self::set_register).
    pub const fn clear_register(self, bank0: u32, bank1: u32) -> u32 {
        self.set_register(bank0, bank1).wrapping_add(CLEAR_OFFSET)
    }
}

// ── Bit fields ───────────────────────────────────────────────────────────────

/// A bit field inside one register word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    /// Register offset.
    pub offset: u32,
    /// Position of the field's least significant bit.
    pub shift: u8,
    /// Field width in bits (1–31).
    pub width: u8,
}

impl Field {
    /// Describe a field of `width` bits starting at bit `shift` of `offset`.
    pub const fn new(offset: u32, shift: u8, width: u8) -> Self {
        Self {
            offset,
            shift,
            width,
        }
    }

    /// Right-aligned mask of the field width.
    pub const fn mask(self) -> u32 {
        (1u32 << self.width).wrapping_sub(1)
    }

    /// Extract the field from a full register value.
    pub const fn extract(self, value: u32) -> u32 {
        (value >> self.shift) & self.mask()
    }

    /// Read the register and extract the field.
    pub fn read<M: RegisterMap + ?Sized>(self, regs: &M) -> Result<u32, M::Error> {
        regs.read(self.offset).map(|v| self.extract(v))
    }
}

/// `GENMASK(high, low)`: contiguous mask of bits `low..=high`.
pub const fn genmask(high: u8, low: u8) -> u32 {
    (u32::MAX >> (31 - high)) & (u32::MAX << low)
}

/// Single-bit mask.
pub const fn bit(n: u8) -> u32 {
    1 << n
}
