//! `mov` (spec.md §8 scenarios 1, 2 and 4 all exercise this mnemonic).
//!
//! Schema order: segment-register forms, then the bare-offset `moffs` forms
//! (preferred over the general r/m form whenever the address has no base or
//! index register), then the general `r/m, r` and `r, r/m` forms, then the
//! register-immediate short forms (`B0+r`/`B8+r`), then the `r/m, imm` forms.

use crate::cpu::CpuTarget;
use crate::schema::{
    schema, with_cpu_min, with_moffset as moffset, with_rm, ArgMatcher::*, Schema, TemplateAtom::*,
};

const fn cpu386(s: Schema) -> Schema {
    with_cpu_min(s, CpuTarget::I386)
}

static MOV: [Schema; 18] = [
    with_rm(schema("mov", &[Rmw, Sr], &[Byte(0x8C), ModRm]), 0),
    with_rm(schema("mov", &[Sr, Rmw], &[Byte(0x8E), ModRm]), 1),
    moffset(with_rm(
        schema("mov", &[Al, Moffs], &[Byte(0xA0), Disp(0), Disp(1)]),
        1,
    )),
    moffset(with_rm(
        schema("mov", &[Ax, Moffs], &[Byte(0xA1), Disp(0), Disp(1)]),
        1,
    )),
    moffset(with_rm(
        schema("mov", &[Moffs, Al], &[Byte(0xA2), Disp(0), Disp(1)]),
        0,
    )),
    moffset(with_rm(
        schema("mov", &[Moffs, Ax], &[Byte(0xA3), Disp(0), Disp(1)]),
        0,
    )),
    with_rm(schema("mov", &[Rmb, Rb], &[Byte(0x88), ModRm]), 0),
    with_rm(schema("mov", &[Rmw, Rw], &[Byte(0x89), ModRm]), 0),
    with_rm(cpu386(schema("mov", &[Rmd, Rd], &[Byte(0x89), ModRm])), 0),
    with_rm(schema("mov", &[Rb, Rmb], &[Byte(0x8A), ModRm]), 1),
    with_rm(schema("mov", &[Rw, Rmw], &[Byte(0x8B), ModRm]), 1),
    with_rm(cpu386(schema("mov", &[Rd, Rmd], &[Byte(0x8B), ModRm])), 1),
    with_rm(
        schema("mov", &[Rb, Ib], &[OpcodeReg(0xB0), Imm(0)]),
        0,
    ),
    with_rm(
        schema("mov", &[Rw, Iw], &[OpcodeReg(0xB8), Imm(0), Imm(1)]),
        0,
    ),
    with_rm(
        cpu386(schema(
            "mov",
            &[Rd, Id],
            &[OpcodeReg(0xB8), Imm(0), Imm(1), Imm(2), Imm(3)],
        )),
        0,
    ),
    with_rm(
        schema("mov", &[Rmb, Ib], &[Byte(0xC6), ModRmDigit(0), Imm(0)]),
        0,
    ),
    with_rm(
        schema("mov", &[Rmw, Iw], &[Byte(0xC7), ModRmDigit(0), Imm(0), Imm(1)]),
        0,
    ),
    with_rm(
        cpu386(schema(
            "mov",
            &[Rmd, Id],
            &[Byte(0xC7), ModRmDigit(0), Imm(0), Imm(1), Imm(2), Imm(3)],
        )),
        0,
    ),
];

pub fn lookup(mnemonic: &str) -> Option<&'static [Schema]> {
    match mnemonic {
        "mov" => Some(&MOV),
        _ => None,
    }
}
