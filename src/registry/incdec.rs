//! `inc`/`dec`: register operands prefer the compact `40+r`/`48+r` opcode
//! forms; memory operands fall back to `FE`/`FF` with the ModR/M digit.

use crate::cpu::CpuTarget;
use crate::schema::{schema, with_cpu_min, with_rm, ArgMatcher::*, Schema, TemplateAtom::*};

const fn cpu386(s: Schema) -> Schema {
    with_cpu_min(s, CpuTarget::I386)
}

static INC: [Schema; 5] = [
    with_rm(schema("inc", &[Rw], &[OpcodeReg(0x40)]), 0),
    with_rm(cpu386(schema("inc", &[Rd], &[OpcodeReg(0x40)])), 0),
    with_rm(schema("inc", &[Rmb], &[Byte(0xFE), ModRmDigit(0)]), 0),
    with_rm(schema("inc", &[Rmw], &[Byte(0xFF), ModRmDigit(0)]), 0),
    with_rm(cpu386(schema("inc", &[Rmd], &[Byte(0xFF), ModRmDigit(0)])), 0),
];

static DEC: [Schema; 5] = [
    with_rm(schema("dec", &[Rw], &[OpcodeReg(0x48)]), 0),
    with_rm(cpu386(schema("dec", &[Rd], &[OpcodeReg(0x48)])), 0),
    with_rm(schema("dec", &[Rmb], &[Byte(0xFE), ModRmDigit(1)]), 0),
    with_rm(schema("dec", &[Rmw], &[Byte(0xFF), ModRmDigit(1)]), 0),
    with_rm(cpu386(schema("dec", &[Rmd], &[Byte(0xFF), ModRmDigit(1)])), 0),
];

pub fn lookup(mnemonic: &str) -> Option<&'static [Schema]> {
    match mnemonic {
        "inc" => Some(&INC),
        "dec" => Some(&DEC),
        _ => None,
    }
}
