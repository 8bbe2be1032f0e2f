//! Control-flow mnemonics: unconditional/conditional jumps, `call`/`ret`,
//! and the `loop` family.
//!
//! Every conditional jump has a short (`rel8`) and near (`rel16`) pair;
//! listing the short form first lets the matcher's pessimistic/optimistic
//! asymmetry (`crate::matcher::rel_matches`) pick the near form on pass one
//! and shrink to short once the target resolves (spec.md §4.3, §4.7;
//! spec.md §8 scenario 5).
//!
//! `jmp`/`call` also each carry an indirect `FF /4`/`FF /2` form
//! (`near_ptr`, spec.md §4.3) for register-or-memory targets (`jmp ax`,
//! `call [bx+2]`).

use crate::schema::{schema, with_rm, ArgMatcher::*, Schema, TemplateAtom::*};

macro_rules! cc {
    ($mnemonic:expr, $short_op:expr) => {
        [
            schema($mnemonic, &[Rel8], &[Byte($short_op), Rel(0)]),
            schema(
                $mnemonic,
                &[Rel16],
                &[Byte(0x0F), Byte($short_op + 0x10), Rel(0), Rel(1)],
            ),
        ]
    };
}

static JMP: [Schema; 3] = [
    schema("jmp", &[Rel8], &[Byte(0xEB), Rel(0)]),
    schema("jmp", &[Rel16], &[Byte(0xE9), Rel(0), Rel(1)]),
    with_rm(
        schema("jmp", &[NearPtr], &[Byte(0xFF), ModRmDigit(4)]),
        0,
    ),
];

static CALL: [Schema; 2] = [
    schema("call", &[Rel16], &[Byte(0xE8), Rel(0), Rel(1)]),
    with_rm(
        schema("call", &[NearPtr], &[Byte(0xFF), ModRmDigit(2)]),
        0,
    ),
];

static RET: [Schema; 2] = [
    schema("ret", &[], &[Byte(0xC3)]),
    schema("ret", &[Iw], &[Byte(0xC2), Imm(0), Imm(1)]),
];

static RETF: [Schema; 2] = [
    schema("retf", &[], &[Byte(0xCB)]),
    schema("retf", &[Iw], &[Byte(0xCA), Imm(0), Imm(1)]),
];

static LOOP: [Schema; 1] = [schema("loop", &[Rel8], &[Byte(0xE2), Rel(0)])];
static LOOPE: [Schema; 1] = [schema("loope", &[Rel8], &[Byte(0xE1), Rel(0)])];
static LOOPZ: [Schema; 1] = [schema("loopz", &[Rel8], &[Byte(0xE1), Rel(0)])];
static LOOPNE: [Schema; 1] = [schema("loopne", &[Rel8], &[Byte(0xE0), Rel(0)])];
static LOOPNZ: [Schema; 1] = [schema("loopnz", &[Rel8], &[Byte(0xE0), Rel(0)])];
static JCXZ: [Schema; 1] = [schema("jcxz", &[Rel8], &[Byte(0xE3), Rel(0)])];

static JC: [Schema; 2] = cc!("jc", 0x72);
static JNC: [Schema; 2] = cc!("jnc", 0x73);
static JZ: [Schema; 2] = cc!("jz", 0x74);
static JE: [Schema; 2] = cc!("je", 0x74);
static JNZ: [Schema; 2] = cc!("jnz", 0x75);
static JNE: [Schema; 2] = cc!("jne", 0x75);
static JBE: [Schema; 2] = cc!("jbe", 0x76);
static JNA: [Schema; 2] = cc!("jna", 0x76);
static JA: [Schema; 2] = cc!("ja", 0x77);
static JNBE: [Schema; 2] = cc!("jnbe", 0x77);
static JS: [Schema; 2] = cc!("js", 0x78);
static JNS: [Schema; 2] = cc!("jns", 0x79);
static JP: [Schema; 2] = cc!("jp", 0x7A);
static JNP: [Schema; 2] = cc!("jnp", 0x7B);
static JL: [Schema; 2] = cc!("jl", 0x7C);
static JGE: [Schema; 2] = cc!("jge", 0x7D);
static JLE: [Schema; 2] = cc!("jle", 0x7E);
static JG: [Schema; 2] = cc!("jg", 0x7F);
static JB: [Schema; 2] = cc!("jb", 0x72);
static JNAE: [Schema; 2] = cc!("jnae", 0x72);
static JAE: [Schema; 2] = cc!("jae", 0x73);
static JNB: [Schema; 2] = cc!("jnb", 0x73);

pub fn lookup(mnemonic: &str) -> Option<&'static [Schema]> {
    match mnemonic {
        "jmp" => Some(&JMP),
        "call" => Some(&CALL),
        "ret" | "retn" => Some(&RET),
        "retf" => Some(&RETF),
        "loop" => Some(&LOOP),
        "loope" => Some(&LOOPE),
        "loopz" => Some(&LOOPZ),
        "loopne" => Some(&LOOPNE),
        "loopnz" => Some(&LOOPNZ),
        "jcxz" => Some(&JCXZ),
        "jc" => Some(&JC),
        "jnc" => Some(&JNC),
        "jz" => Some(&JZ),
        "je" => Some(&JE),
        "jnz" => Some(&JNZ),
        "jne" => Some(&JNE),
        "jbe" => Some(&JBE),
        "jna" => Some(&JNA),
        "ja" => Some(&JA),
        "jnbe" => Some(&JNBE),
        "js" => Some(&JS),
        "jns" => Some(&JNS),
        "jp" => Some(&JP),
        "jnp" => Some(&JNP),
        "jl" => Some(&JL),
        "jge" => Some(&JGE),
        "jle" => Some(&JLE),
        "jg" => Some(&JG),
        "jb" => Some(&JB),
        "jnae" => Some(&JNAE),
        "jae" => Some(&JAE),
        "jnb" => Some(&JNB),
        _ => None,
    }
}
