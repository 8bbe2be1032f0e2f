//! Instruction encoder (spec.md §4.5, §4.6).
//!
//! Walks a matched [`Schema`]'s `binary_template` left to right, emitting
//! literal bytes, the assembled ModR/M/SIB byte(s), displacement,
//! immediate, relative-offset, and segmented-pointer bytes, prefixed by
//! any instruction prefixes and a segment-override byte.

use crate::ast::{InstructionPrefix, Operand};
use crate::cpu::BitsMode;
use crate::error::{CompileError, ErrorCode, SourceLoc};
use crate::memaddr;
use crate::modrm::{pack_modrm, pack_sib};
use crate::rpn::LabelResolver;
use crate::schema::{Schema, TemplateAtom};

pub struct EncodeContext<'a> {
    pub bits: BitsMode,
    /// Address of the byte following this instruction (spec.md §4.6: `r0`/`r1`
    /// relative offsets are computed against the instruction's own total
    /// size, including prefixes).
    pub next_addr: u32,
    pub resolver: Option<(&'a dyn LabelResolver, Option<&'a str>)>,
    pub loc: SourceLoc,
}

struct RmInfo {
    modbits: u8,
    reg: u8,
    rm: u8,
    sib: Option<u8>,
    disp_len: u8,
    disp_value: i64,
}

pub fn encode(
    schema: &Schema,
    prefixes: &[InstructionPrefix],
    operands: &[Operand],
    ctx: &EncodeContext,
) -> Result<Vec<u8>, CompileError> {
    let mut out = Vec::new();

    for p in prefixes {
        out.push(p.byte());
    }

    if let Some(sreg_byte) = segment_override_byte(operands, ctx.loc)? {
        out.push(sreg_byte);
    }

    let rm_info = match schema.rm {
        Some(idx) => Some(build_rm_info(schema, idx, operands, ctx)?),
        None => None,
    };

    for atom in schema.binary_template {
        match *atom {
            TemplateAtom::Byte(b) => out.push(b),
            TemplateAtom::OpcodeReg(base) => {
                let info = rm_info
                    .as_ref()
                    .ok_or_else(|| missing_rm(schema, ctx.loc))?;
                out.push(base | (info.rm & 0b111));
            }
            TemplateAtom::ModRm => {
                let info = rm_info
                    .as_ref()
                    .ok_or_else(|| missing_rm(schema, ctx.loc))?;
                out.push(pack_modrm(info.modbits, info.reg, info.rm));
                if let Some(sib) = info.sib {
                    out.push(sib);
                }
            }
            TemplateAtom::ModRmDigit(digit) => {
                let info = rm_info
                    .as_ref()
                    .ok_or_else(|| missing_rm(schema, ctx.loc))?;
                out.push(pack_modrm(info.modbits, digit, info.rm));
                if let Some(sib) = info.sib {
                    out.push(sib);
                }
            }
            TemplateAtom::Disp(n) => {
                let info = rm_info
                    .as_ref()
                    .ok_or_else(|| missing_rm(schema, ctx.loc))?;
                if n < info.disp_len {
                    out.push(byte_of(info.disp_value, n));
                }
            }
            TemplateAtom::Imm(n) => {
                let value = immediate_value(operands, ctx)?;
                out.push(byte_of(value, n));
            }
            TemplateAtom::Rel(n) => {
                let target = relative_target(operands, ctx)?;
                let distance = target - ctx.next_addr as i64;
                out.push(byte_of(distance, n));
            }
            TemplateAtom::SegOff(n) => {
                let (offset, _) = segmented_value(operands, ctx.loc)?;
                out.push(byte_of(offset, n));
            }
            TemplateAtom::SegSeg(n) => {
                let (_, segment) = segmented_value(operands, ctx.loc)?;
                out.push(byte_of(segment as i64, n));
            }
        }
    }

    Ok(out)
}

fn missing_rm(schema: &Schema, loc: SourceLoc) -> CompileError {
    CompileError::at(ErrorCode::MISSING_RM_BYTE_DEF, loc).with("mnemonic", schema.mnemonic)
}

fn byte_of(value: i64, n: u8) -> u8 {
    ((value >> (8 * n as u32)) & 0xFF) as u8
}

fn build_rm_info(
    schema: &Schema,
    rm_idx: u8,
    operands: &[Operand],
    ctx: &EncodeContext,
) -> Result<RmInfo, CompileError> {
    let rm_operand = operands
        .get(rm_idx as usize)
        .ok_or_else(|| missing_rm(schema, ctx.loc))?;

    let reg_bits = operands
        .iter()
        .enumerate()
        .find_map(|(i, op)| match (i as u8 != rm_idx, op) {
            (true, Operand::Register(r)) => Some(r.code),
            _ => None,
        })
        .unwrap_or(0);

    match rm_operand {
        Operand::Register(r) => Ok(RmInfo {
            modbits: 0b11,
            reg: reg_bits,
            rm: r.code,
            sib: None,
            disp_len: 0,
            disp_value: 0,
        }),
        Operand::Memory(m) => {
            let desc = m
                .resolved
                .ok_or_else(|| CompileError::at(ErrorCode::INVALID_ADDRESSING_MODE, ctx.loc))?;

            if schema.moffset {
                let width = ctx.bits.default_size();
                return Ok(RmInfo {
                    modbits: 0,
                    reg: reg_bits,
                    rm: 0,
                    sib: None,
                    disp_len: width,
                    disp_value: desc.displacement,
                });
            }

            if ctx.bits == BitsMode::Bits32 || desc.uses_32bit_regs() {
                let sib32 = memaddr::modrm32(desc.base, desc.index, desc.scale, desc.disp_byte_size)
                    .ok_or_else(|| CompileError::at(ErrorCode::IMPOSSIBLE_MEM_REG, ctx.loc))?;
                let disp_len = match sib32.mode {
                    0b01 => 1,
                    0b10 => 4,
                    0b00 if sib32.rm == 0b101 => 4,
                    0b00 if sib32.sib.map_or(false, |(_, _, b)| b == 0b101) => 4,
                    _ => 0,
                };
                let sib = sib32
                    .sib
                    .map(|(scale, index, base)| pack_sib(scale, index, base));
                Ok(RmInfo {
                    modbits: sib32.mode,
                    reg: reg_bits,
                    rm: sib32.rm,
                    sib,
                    disp_len,
                    disp_value: desc.displacement,
                })
            } else {
                let (modbits, rm) = memaddr::modrm16(desc.base, desc.index, desc.disp_byte_size)
                    .ok_or_else(|| CompileError::at(ErrorCode::IMPOSSIBLE_MEM_REG, ctx.loc))?;
                let disp_len = match modbits {
                    0b00 if rm == 6 => 2,
                    0b00 => 0,
                    0b01 => 1,
                    _ => 2,
                };
                Ok(RmInfo {
                    modbits,
                    reg: reg_bits,
                    rm,
                    sib: None,
                    disp_len,
                    disp_value: desc.displacement,
                })
            }
        }
        _ => Err(CompileError::at(ErrorCode::INVALID_ADDRESSING_MODE, ctx.loc)),
    }
}

fn segment_override_byte(
    operands: &[Operand],
    loc: SourceLoc,
) -> Result<Option<u8>, CompileError> {
    let mut found: Option<u8> = None;
    for op in operands {
        if let Operand::Memory(m) = op {
            if let Some(desc) = &m.resolved {
                if let Some(sreg) = desc.sreg {
                    if let Some(byte) = crate::register::segment_override_prefix(sreg) {
                        match found {
                            Some(existing) if existing != byte => {
                                return Err(CompileError::at(
                                    ErrorCode::CONFLICT_SREG_OVERRIDE,
                                    loc,
                                ))
                            }
                            _ => found = Some(byte),
                        }
                    }
                }
            }
        }
    }
    Ok(found)
}

fn immediate_value(operands: &[Operand], ctx: &EncodeContext) -> Result<i64, CompileError> {
    for op in operands {
        match op {
            Operand::Number(n) => return Ok(n.value),
            Operand::Label(l) => return resolve_label_value(l.name.as_str(), ctx),
            _ => {}
        }
    }
    Err(CompileError::at(ErrorCode::MISSING_IMM_ARG_DEF, ctx.loc))
}

fn relative_target(operands: &[Operand], ctx: &EncodeContext) -> Result<i64, CompileError> {
    for op in operands {
        match op {
            Operand::Label(l) => return resolve_label_value(l.name.as_str(), ctx),
            Operand::Number(n) => return Ok(n.value),
            _ => {}
        }
    }
    Err(CompileError::at(ErrorCode::MISSING_IMM_ARG_DEF, ctx.loc))
}

fn resolve_label_value(name: &str, ctx: &EncodeContext) -> Result<i64, CompileError> {
    match ctx.resolver {
        Some((resolver, scope)) => resolver
            .resolve(name, scope)
            .ok_or_else(|| CompileError::at(ErrorCode::UNKNOWN_LABEL, ctx.loc).with("label", name)),
        // Pessimistic first pass: no resolver yet, placeholder value.
        None => Ok(0),
    }
}

fn segmented_value(operands: &[Operand], loc: SourceLoc) -> Result<(i64, u16), CompileError> {
    for op in operands {
        if let Operand::SegMem(s) = op {
            return Ok((s.offset, s.segment));
        }
    }
    Err(CompileError::at(
        ErrorCode::INCORRECT_SEGMENTED_MEM_FORMAT,
        loc,
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::NumberOperand;
    use crate::register;
    use crate::schema::{schema, ArgMatcher};

    struct NoResolver;
    impl LabelResolver for NoResolver {
        fn resolve(&self, _name: &str, _scope: Option<&str>) -> Option<i64> {
            None
        }
    }

    fn loc() -> SourceLoc {
        SourceLoc::new(1, 1)
    }

    #[test]
    fn reg_reg_modrm() {
        let s = schema(
            "mov",
            &[ArgMatcher::Rmw, ArgMatcher::Rw],
            &[TemplateAtom::Byte(0x89), TemplateAtom::ModRm],
        );
        let ax = Operand::Register(register::lookup("ax").unwrap());
        let bx = Operand::Register(register::lookup("bx").unwrap());
        let ctx = EncodeContext {
            bits: BitsMode::Bits16,
            next_addr: 2,
            resolver: None,
            loc: loc(),
        };
        let schema_with_rm = Schema { rm: Some(0), ..s };
        let bytes = encode(&schema_with_rm, &[], &[ax, bx], &ctx).unwrap();
        assert_eq!(bytes, vec![0x89, pack_modrm(0b11, 3, 0)]);
    }

    #[test]
    fn immediate_byte() {
        let s = schema(
            "mov",
            &[ArgMatcher::Al, ArgMatcher::Ib],
            &[TemplateAtom::Byte(0xB0), TemplateAtom::Imm(0)],
        );
        let al = Operand::Register(register::lookup("al").unwrap());
        let imm = Operand::Number(NumberOperand::new(5, 1));
        let ctx = EncodeContext {
            bits: BitsMode::Bits16,
            next_addr: 2,
            resolver: None,
            loc: loc(),
        };
        let bytes = encode(&s, &[], &[al, imm], &ctx).unwrap();
        assert_eq!(bytes, vec![0xB0, 0x05]);
    }
}
