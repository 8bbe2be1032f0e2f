//! Single-operand `F6`/`F7` group: `not`/`neg`/`mul`/`imul`/`div`/`idiv`.

use crate::cpu::CpuTarget;
use crate::schema::{schema, with_cpu_min, with_rm, ArgMatcher::*, Schema, TemplateAtom::*};

const fn cpu386(s: Schema) -> Schema {
    with_cpu_min(s, CpuTarget::I386)
}

macro_rules! unary_schemas {
    ($mnemonic:expr, $digit:expr) => {
        [
            with_rm(
                schema($mnemonic, &[Rmb], &[Byte(0xF6), ModRmDigit($digit)]),
                0,
            ),
            with_rm(
                schema($mnemonic, &[Rmw], &[Byte(0xF7), ModRmDigit($digit)]),
                0,
            ),
            with_rm(
                cpu386(schema($mnemonic, &[Rmd], &[Byte(0xF7), ModRmDigit($digit)])),
                0,
            ),
        ]
    };
}

static NOT: [Schema; 3] = unary_schemas!("not", 2);
static NEG: [Schema; 3] = unary_schemas!("neg", 3);
static MUL: [Schema; 3] = unary_schemas!("mul", 4);
static IMUL: [Schema; 3] = unary_schemas!("imul", 5);
static DIV: [Schema; 3] = unary_schemas!("div", 6);
static IDIV: [Schema; 3] = unary_schemas!("idiv", 7);

pub fn lookup(mnemonic: &str) -> Option<&'static [Schema]> {
    match mnemonic {
        "not" => Some(&NOT),
        "neg" => Some(&NEG),
        "mul" => Some(&MUL),
        "imul" => Some(&IMUL),
        "div" => Some(&DIV),
        "idiv" => Some(&IDIV),
        _ => None,
    }
}
