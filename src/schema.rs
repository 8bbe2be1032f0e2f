//! Schema registry data types (spec.md §3, §4.1).
//!
//! A [`Schema`] is one candidate operand-pattern + binary-template encoding
//! for a mnemonic. Schemas are `'static` and process-wide; `crate::registry`
//! builds the ordered-by-mnemonic table once, as literal array data (no
//! runtime construction, no locks — spec.md §5).

use crate::cpu::CpuTarget;

/// One positional operand matcher (spec.md §4.1, §4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgMatcher {
    Al,
    Ah,
    Ax,
    Eax,
    Cl,
    Dx,
    /// Any 8-bit general purpose register.
    Rb,
    /// Any 16-bit general purpose register.
    Rw,
    /// Any 32-bit general purpose register.
    Rd,
    /// Any segment register.
    Sr,
    /// Register or memory, 8 bits.
    Rmb,
    /// Register or memory, 16 bits.
    Rmw,
    /// Register or memory, 32 bits.
    Rmd,
    /// Memory only, 8 bits.
    Mb,
    /// Memory only, 16 bits.
    Mw,
    /// Memory only, 32 bits.
    Md,
    /// Immediate, 8 bits.
    Ib,
    /// Immediate, 16 bits.
    Iw,
    /// Immediate, 32 bits.
    Id,
    /// Immediate that is representable sign-extended from one byte
    /// (spec.md §4.3 — the `0x83`-style opcode trick).
    IbS,
    /// Immediate literal `1`, used by the single-shift opcode forms.
    Imm1,
    Rel8,
    Rel16,
    NearPtr,
    FarPtr,
    Moffs,
    /// Top of x87 stack (`st0`).
    St,
    /// Any x87 stack register (`st0`..`st7`).
    Sti,
}

/// One atom of a schema's binary template (spec.md §4.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateAtom {
    Byte(u8),
    /// `iN`: byte N (little-endian) of the immediate operand.
    Imm(u8),
    /// `dN`: byte N of the displacement.
    Disp(u8),
    /// `rN`: byte N of a PC-relative offset.
    Rel(u8),
    /// `oN`: byte N of the offset half of a segmented immediate.
    SegOff(u8),
    /// `sN`: byte N of the segment half of a segmented immediate.
    SegSeg(u8),
    /// `mr`: the assembled ModR/M byte.
    ModRm,
    /// `/N`: ModR/M byte with `reg` fixed to `N`.
    ModRmDigit(u8),
    /// `+rb`/`+rw`/`+rd`: the literal byte OR'd with the low 3 bits of the
    /// rm operand's register code (the `B0+r`/`40+r`/`50+r`-style compact
    /// opcode forms NASM prefers over the ModR/M-encoded equivalent).
    OpcodeReg(u8),
}

/// One candidate schema for a mnemonic (spec.md §3, §4.1).
#[derive(Clone, Copy, Debug)]
pub struct Schema {
    pub mnemonic: &'static str,
    pub arg_matchers: &'static [ArgMatcher],
    pub binary_template: &'static [TemplateAtom],
    pub target_cpu_min: CpuTarget,
    /// True for moffset forms (`mov al, [imm16]`): the address is a bare
    /// offset rather than a ModR/M memory form.
    pub moffset: bool,
    /// True when the immediate atoms actually encode a PC-relative offset
    /// rather than a literal value (kept distinct from `Rel` atoms so the
    /// encoder can tell `call rel16` apart from `mov ax, imm16` at a glance
    /// when both exist side by side in a template; currently every schema
    /// that needs this also uses `TemplateAtom::Rel`, so this flag mirrors
    /// that — see `crate::encoder`).
    pub imm_is_relative: bool,
    /// Index (into `arg_matchers`/operands) of the operand whose register or
    /// memory encoding fills ModR/M's `r/m` field, or `None` if the
    /// instruction has no ModR/M byte.
    pub rm: Option<u8>,
}

pub const fn schema(
    mnemonic: &'static str,
    arg_matchers: &'static [ArgMatcher],
    binary_template: &'static [TemplateAtom],
) -> Schema {
    Schema {
        mnemonic,
        arg_matchers,
        binary_template,
        target_cpu_min: CpuTarget::I8086,
        moffset: false,
        imm_is_relative: false,
        rm: None,
    }
}

/// Record which operand index fills ModR/M's `r/m` field (spec.md §3's
/// `rm_flag_on_which_arg`).
pub const fn with_rm(s: Schema, idx: u8) -> Schema {
    Schema { rm: Some(idx), ..s }
}

/// Raise a schema's minimum CPU target (used for 386+-only widened forms).
pub const fn with_cpu_min(s: Schema, cpu: CpuTarget) -> Schema {
    Schema {
        target_cpu_min: cpu,
        ..s
    }
}

/// Mark a schema as a bare-offset `moffs` form (spec.md §4.1, §4.3).
pub const fn with_moffset(s: Schema) -> Schema {
    Schema { moffset: true, ..s }
}
