//! `push`/`pop`, register forms preferred over the ModR/M memory forms.

use crate::cpu::CpuTarget;
use crate::schema::{schema, with_cpu_min, with_rm, ArgMatcher::*, Schema, TemplateAtom::*};

const fn cpu386(s: Schema) -> Schema {
    with_cpu_min(s, CpuTarget::I386)
}

static PUSH: [Schema; 4] = [
    with_rm(schema("push", &[Rw], &[OpcodeReg(0x50)]), 0),
    with_rm(cpu386(schema("push", &[Rd], &[OpcodeReg(0x50)])), 0),
    with_rm(schema("push", &[Rmw], &[Byte(0xFF), ModRmDigit(6)]), 0),
    with_rm(
        cpu386(schema("push", &[Rmd], &[Byte(0xFF), ModRmDigit(6)])),
        0,
    ),
];

static POP: [Schema; 4] = [
    with_rm(schema("pop", &[Rw], &[OpcodeReg(0x58)]), 0),
    with_rm(cpu386(schema("pop", &[Rd], &[OpcodeReg(0x58)])), 0),
    with_rm(schema("pop", &[Rmw], &[Byte(0x8F), ModRmDigit(0)]), 0),
    with_rm(
        cpu386(schema("pop", &[Rmd], &[Byte(0x8F), ModRmDigit(0)])),
        0,
    ),
];

pub fn lookup(mnemonic: &str) -> Option<&'static [Schema]> {
    match mnemonic {
        "push" => Some(&PUSH),
        "pop" => Some(&POP),
        _ => None,
    }
}
