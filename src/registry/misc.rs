//! Flag/control zero-operand instructions plus `lea`, `xchg`, `in`/`out`,
//! `int`, and `xlat`.

use crate::cpu::CpuTarget;
use crate::schema::{schema, with_cpu_min, with_rm, ArgMatcher::*, Schema, TemplateAtom::*};

const fn cpu386(s: Schema) -> Schema {
    with_cpu_min(s, CpuTarget::I386)
}

static NOP: [Schema; 1] = [schema("nop", &[], &[Byte(0x90)])];
static HLT: [Schema; 1] = [schema("hlt", &[], &[Byte(0xF4)])];
static CLI: [Schema; 1] = [schema("cli", &[], &[Byte(0xFA)])];
static STI: [Schema; 1] = [schema("sti", &[], &[Byte(0xFB)])];
static CLD: [Schema; 1] = [schema("cld", &[], &[Byte(0xFC)])];
static STD: [Schema; 1] = [schema("std", &[], &[Byte(0xFD)])];
static CLC: [Schema; 1] = [schema("clc", &[], &[Byte(0xF8)])];
static STC: [Schema; 1] = [schema("stc", &[], &[Byte(0xF9)])];
static CMC: [Schema; 1] = [schema("cmc", &[], &[Byte(0xF5)])];
static INT3: [Schema; 1] = [schema("int3", &[], &[Byte(0xCC)])];
static INTO: [Schema; 1] = [schema("into", &[], &[Byte(0xCE)])];
static IRET: [Schema; 1] = [schema("iret", &[], &[Byte(0xCF)])];
static PUSHF: [Schema; 1] = [schema("pushf", &[], &[Byte(0x9C)])];
static POPF: [Schema; 1] = [schema("popf", &[], &[Byte(0x9D)])];
static CBW: [Schema; 1] = [schema("cbw", &[], &[Byte(0x98)])];
static CWD: [Schema; 1] = [schema("cwd", &[], &[Byte(0x99)])];
static XLAT: [Schema; 1] = [schema("xlat", &[], &[Byte(0xD7)])];

static INT: [Schema; 1] = [schema("int", &[Ib], &[Byte(0xCD), Imm(0)])];

static LEA: [Schema; 2] = [
    with_rm(schema("lea", &[Rw, Mw], &[Byte(0x8D), ModRm]), 1),
    with_rm(cpu386(schema("lea", &[Rd, Md], &[Byte(0x8D), ModRm])), 1),
];

static XCHG: [Schema; 3] = [
    with_rm(schema("xchg", &[Rmb, Rb], &[Byte(0x86), ModRm]), 0),
    with_rm(schema("xchg", &[Rmw, Rw], &[Byte(0x87), ModRm]), 0),
    with_rm(cpu386(schema("xchg", &[Rmd, Rd], &[Byte(0x87), ModRm])), 0),
];

static IN: [Schema; 4] = [
    schema("in", &[Al, Ib], &[Byte(0xE4), Imm(0)]),
    schema("in", &[Ax, Ib], &[Byte(0xE5), Imm(0)]),
    schema("in", &[Al, Dx], &[Byte(0xEC)]),
    schema("in", &[Ax, Dx], &[Byte(0xED)]),
];

static OUT: [Schema; 4] = [
    schema("out", &[Ib, Al], &[Byte(0xE6), Imm(0)]),
    schema("out", &[Ib, Ax], &[Byte(0xE7), Imm(0)]),
    schema("out", &[Dx, Al], &[Byte(0xEE)]),
    schema("out", &[Dx, Ax], &[Byte(0xEF)]),
];

pub fn lookup(mnemonic: &str) -> Option<&'static [Schema]> {
    match mnemonic {
        "nop" => Some(&NOP),
        "hlt" => Some(&HLT),
        "cli" => Some(&CLI),
        "sti" => Some(&STI),
        "cld" => Some(&CLD),
        "std" => Some(&STD),
        "clc" => Some(&CLC),
        "stc" => Some(&STC),
        "cmc" => Some(&CMC),
        "int3" => Some(&INT3),
        "into" => Some(&INTO),
        "iret" => Some(&IRET),
        "pushf" => Some(&PUSHF),
        "popf" => Some(&POPF),
        "cbw" => Some(&CBW),
        "cwd" => Some(&CWD),
        "xlat" => Some(&XLAT),
        "int" => Some(&INT),
        "lea" => Some(&LEA),
        "xchg" => Some(&XCHG),
        "in" => Some(&IN),
        "out" => Some(&OUT),
        _ => None,
    }
}
