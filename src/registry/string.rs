//! Zero-operand string-move/compare/scan instructions.

use crate::schema::{schema, Schema, TemplateAtom::Byte};

static MOVSB: [Schema; 1] = [schema("movsb", &[], &[Byte(0xA4)])];
static MOVSW: [Schema; 1] = [schema("movsw", &[], &[Byte(0xA5)])];
static CMPSB: [Schema; 1] = [schema("cmpsb", &[], &[Byte(0xA6)])];
static CMPSW: [Schema; 1] = [schema("cmpsw", &[], &[Byte(0xA7)])];
static STOSB: [Schema; 1] = [schema("stosb", &[], &[Byte(0xAA)])];
static STOSW: [Schema; 1] = [schema("stosw", &[], &[Byte(0xAB)])];
static LODSB: [Schema; 1] = [schema("lodsb", &[], &[Byte(0xAC)])];
static LODSW: [Schema; 1] = [schema("lodsw", &[], &[Byte(0xAD)])];
static SCASB: [Schema; 1] = [schema("scasb", &[], &[Byte(0xAE)])];
static SCASW: [Schema; 1] = [schema("scasw", &[], &[Byte(0xAF)])];

pub fn lookup(mnemonic: &str) -> Option<&'static [Schema]> {
    match mnemonic {
        "movsb" => Some(&MOVSB),
        "movsw" => Some(&MOVSW),
        "cmpsb" => Some(&CMPSB),
        "cmpsw" => Some(&CMPSW),
        "stosb" => Some(&STOSB),
        "stosw" => Some(&STOSW),
        "lodsb" => Some(&LODSB),
        "lodsw" => Some(&LODSW),
        "scasb" => Some(&SCASB),
        "scasw" => Some(&SCASW),
        _ => None,
    }
}
