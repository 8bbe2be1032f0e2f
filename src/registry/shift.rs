//! Shift/rotate group: `rol`/`ror`/`rcl`/`rcr`/`shl`/`sal`/`shr`/`sar`.
//! All eight mnemonics share one opcode family, distinguished only by the
//! ModR/M `reg` digit; `shl` and `sal` are the same digit (NASM accepts
//! both spellings for the same encoding).

use crate::cpu::CpuTarget;
use crate::schema::{schema, with_cpu_min, with_rm, ArgMatcher::*, Schema, TemplateAtom::*};

const fn cpu186(s: Schema) -> Schema {
    with_cpu_min(s, CpuTarget::I186)
}

macro_rules! shift_schemas {
    ($mnemonic:expr, $digit:expr) => {
        [
            with_rm(
                schema($mnemonic, &[Rmb, Imm1], &[Byte(0xD0), ModRmDigit($digit)]),
                0,
            ),
            with_rm(
                schema($mnemonic, &[Rmw, Imm1], &[Byte(0xD1), ModRmDigit($digit)]),
                0,
            ),
            with_rm(
                schema($mnemonic, &[Rmb, Cl], &[Byte(0xD2), ModRmDigit($digit)]),
                0,
            ),
            with_rm(
                schema($mnemonic, &[Rmw, Cl], &[Byte(0xD3), ModRmDigit($digit)]),
                0,
            ),
            with_rm(
                cpu186(schema(
                    $mnemonic,
                    &[Rmb, Ib],
                    &[Byte(0xC0), ModRmDigit($digit), Imm(0)],
                )),
                0,
            ),
            with_rm(
                cpu186(schema(
                    $mnemonic,
                    &[Rmw, Ib],
                    &[Byte(0xC1), ModRmDigit($digit), Imm(0)],
                )),
                0,
            ),
            with_rm(
                with_cpu_min(
                    schema($mnemonic, &[Rmd, Imm1], &[Byte(0xD1), ModRmDigit($digit)]),
                    CpuTarget::I386,
                ),
                0,
            ),
            with_rm(
                with_cpu_min(
                    schema($mnemonic, &[Rmd, Cl], &[Byte(0xD3), ModRmDigit($digit)]),
                    CpuTarget::I386,
                ),
                0,
            ),
        ]
    };
}

static ROL: [Schema; 8] = shift_schemas!("rol", 0);
static ROR: [Schema; 8] = shift_schemas!("ror", 1);
static RCL: [Schema; 8] = shift_schemas!("rcl", 2);
static RCR: [Schema; 8] = shift_schemas!("rcr", 3);
static SHL: [Schema; 8] = shift_schemas!("shl", 4);
static SAL: [Schema; 8] = shift_schemas!("sal", 4);
static SHR: [Schema; 8] = shift_schemas!("shr", 5);
static SAR: [Schema; 8] = shift_schemas!("sar", 7);

pub fn lookup(mnemonic: &str) -> Option<&'static [Schema]> {
    match mnemonic {
        "rol" => Some(&ROL),
        "ror" => Some(&ROR),
        "rcl" => Some(&RCL),
        "rcr" => Some(&RCR),
        "shl" => Some(&SHL),
        "sal" => Some(&SAL),
        "shr" => Some(&SHR),
        "sar" => Some(&SAR),
        _ => None,
    }
}
