//! The eight standard ALU-group opcodes (`add`/`or`/`adc`/`sbb`/`and`/`sub`/
//! `xor`/`cmp`) plus `test`, which shares the same opcode shape without the
//! reversed-direction or accumulator-short forms.
//!
//! Schema order matters (spec.md §4.1/§4.3): the sign-extended `0x83` form
//! is listed before the full-width `0x81` form so `sub di, 1` picks the
//! shorter encoding (spec.md §8 boundary behavior).

use crate::cpu::CpuTarget;
use crate::schema::{schema, with_cpu_min, with_rm, ArgMatcher::*, Schema, TemplateAtom::*};

const fn cpu386(s: Schema) -> Schema {
    with_cpu_min(s, CpuTarget::I386)
}

macro_rules! alu_schemas {
    ($mnemonic:expr, $base:expr, $digit:expr) => {
        [
            with_rm(schema($mnemonic, &[Rmb, Rb], &[Byte($base), ModRm]), 0),
            with_rm(schema($mnemonic, &[Rmw, Rw], &[Byte($base + 1), ModRm]), 0),
            with_rm(
                cpu386(schema($mnemonic, &[Rmd, Rd], &[Byte($base + 1), ModRm])),
                0,
            ),
            with_rm(schema($mnemonic, &[Rb, Rmb], &[Byte($base + 2), ModRm]), 1),
            with_rm(schema($mnemonic, &[Rw, Rmw], &[Byte($base + 3), ModRm]), 1),
            with_rm(
                cpu386(schema($mnemonic, &[Rd, Rmd], &[Byte($base + 3), ModRm])),
                1,
            ),
            schema($mnemonic, &[Al, Ib], &[Byte($base + 4), Imm(0)]),
            schema($mnemonic, &[Ax, Iw], &[Byte($base + 5), Imm(0), Imm(1)]),
            cpu386(schema(
                $mnemonic,
                &[Eax, Id],
                &[Byte($base + 5), Imm(0), Imm(1), Imm(2), Imm(3)],
            )),
            with_rm(
                schema(
                    $mnemonic,
                    &[Rmb, Ib],
                    &[Byte(0x80), ModRmDigit($digit), Imm(0)],
                ),
                0,
            ),
            with_rm(
                schema(
                    $mnemonic,
                    &[Rmw, IbS],
                    &[Byte(0x83), ModRmDigit($digit), Imm(0)],
                ),
                0,
            ),
            with_rm(
                schema(
                    $mnemonic,
                    &[Rmw, Iw],
                    &[Byte(0x81), ModRmDigit($digit), Imm(0), Imm(1)],
                ),
                0,
            ),
            with_rm(
                cpu386(schema(
                    $mnemonic,
                    &[Rmd, IbS],
                    &[Byte(0x83), ModRmDigit($digit), Imm(0)],
                )),
                0,
            ),
        ]
    };
}

const fn test_schemas() -> [Schema; 7] {
    [
        with_rm(schema("test", &[Rmb, Rb], &[Byte(0x84), ModRm]), 0),
        with_rm(schema("test", &[Rmw, Rw], &[Byte(0x85), ModRm]), 0),
        with_rm(cpu386(schema("test", &[Rmd, Rd], &[Byte(0x85), ModRm])), 0),
        schema("test", &[Al, Ib], &[Byte(0xA8), Imm(0)]),
        schema("test", &[Ax, Iw], &[Byte(0xA9), Imm(0), Imm(1)]),
        with_rm(
            schema("test", &[Rmb, Ib], &[Byte(0xF6), ModRmDigit(0), Imm(0)]),
            0,
        ),
        with_rm(
            schema("test", &[Rmw, Iw], &[Byte(0xF7), ModRmDigit(0), Imm(0), Imm(1)]),
            0,
        ),
    ]
}

static ADD: [Schema; 13] = alu_schemas!("add", 0x00, 0);
static OR: [Schema; 13] = alu_schemas!("or", 0x08, 1);
static ADC: [Schema; 13] = alu_schemas!("adc", 0x10, 2);
static SBB: [Schema; 13] = alu_schemas!("sbb", 0x18, 3);
static AND: [Schema; 13] = alu_schemas!("and", 0x20, 4);
static SUB: [Schema; 13] = alu_schemas!("sub", 0x28, 5);
static XOR: [Schema; 13] = alu_schemas!("xor", 0x30, 6);
static CMP: [Schema; 13] = alu_schemas!("cmp", 0x38, 7);
static TEST: [Schema; 7] = test_schemas();

pub fn lookup(mnemonic: &str) -> Option<&'static [Schema]> {
    match mnemonic {
        "add" => Some(&ADD),
        "or" => Some(&OR),
        "adc" => Some(&ADC),
        "sbb" => Some(&SBB),
        "and" => Some(&AND),
        "sub" => Some(&SUB),
        "xor" => Some(&XOR),
        "cmp" => Some(&CMP),
        "test" => Some(&TEST),
        _ => None,
    }
}
