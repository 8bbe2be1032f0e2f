//! CPU target and operand/address size mode (ambient supplement, SPEC_FULL.md §3).

use asm86_util::EnumFromStr;
use asm86_util_derive::EnumFromStr;

/// Minimum CPU family a schema requires. Ordered so `target_cpu_min <= active`
/// is a single comparison (spec.md §4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, EnumFromStr)]
pub enum CpuTarget {
    I8086,
    I186,
    I286,
    I386,
    I486,
}

impl Default for CpuTarget {
    fn default() -> CpuTarget {
        CpuTarget::I486
    }
}

/// `[bits 16]` / `[bits 32]` operand-and-address-size mode (spec.md §4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitsMode {
    Bits16,
    Bits32,
}

impl BitsMode {
    pub fn from_u32(n: u32) -> Option<BitsMode> {
        match n {
            16 => Some(BitsMode::Bits16),
            32 => Some(BitsMode::Bits32),
            _ => None,
        }
    }

    /// Default address/operand byte size in this mode (2 for 16-bit, 4 for 32-bit).
    pub fn default_size(self) -> u8 {
        match self {
            BitsMode::Bits16 => 2,
            BitsMode::Bits32 => 4,
        }
    }
}

impl Default for BitsMode {
    fn default() -> BitsMode {
        BitsMode::Bits16
    }
}
