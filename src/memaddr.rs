//! Memory-operand parser (spec.md §4.4) and the 16-bit/32-bit ModR/M
//! addressing tables.
//!
//! The phrase inside `[...]` is re-tokenized independently of the front-end
//! lexer (it is just a `String` on the AST node until this point) and
//! reduced to a [`MemAddressDescription`] in the five steps spec.md §4.4
//! lays out: segment override, scale*index, base/index registers, RPN
//! constant folding, displacement sizing.

use crate::ast::MemAddressDescription;
use crate::cpu::BitsMode;
use crate::error::{CompileError, ErrorCode, SourceLoc};
use crate::register::{self, Register};
use crate::rpn::{self, EvalOutcome, LabelResolver};
use std::convert::TryFrom;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemResolveOutcome {
    Resolved,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Reg(&'static Register),
    ScaledReg(&'static Register, i64),
    Text(String),
}

/// Split `phrase` into segment-override / scale*index / base+index /
/// remaining-arithmetic-text pieces (spec.md §4.4 steps 1-3).
fn split_phrase(
    phrase: &str,
    loc: SourceLoc,
) -> Result<(Option<&'static Register>, Vec<Piece>), CompileError> {
    let mut text = phrase.trim();
    let mut sreg = None;

    if let Some(colon) = text.find(':') {
        let (left, right) = (text[..colon].trim(), text[colon + 1..].trim());
        // Only treat as a segment override when the left side is a bare
        // identifier (not an arithmetic expression containing another colon
        // inside, which cannot happen for a single find, so this is safe).
        match register::lookup(left) {
            Some(r) if r.segment => sreg = Some(r),
            Some(_) | None => {
                return Err(
                    CompileError::at(ErrorCode::REGISTER_IS_NOT_SEGMENT_REG, loc)
                        .with("reg", left.to_owned()),
                )
            }
        }
        text = right;
    }

    // Tokenize into idents/numbers/operators while keeping `*` as a marker.
    let mut pieces = Vec::new();
    let mut buf = String::new();
    let mut flush = |buf: &mut String, pieces: &mut Vec<Piece>| {
        if !buf.trim().is_empty() {
            pieces.push(Piece::Text(std::mem::take(buf)));
        } else {
            buf.clear();
        }
    };

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '+' || c == '-' {
            flush(&mut buf, &mut pieces);
            buf.push(c);
            i += 1;
            continue;
        }
        if c == '*' {
            flush(&mut buf, &mut pieces);
            pieces.push(Piece::Text("*".to_owned()));
            i += 1;
            continue;
        }
        buf.push(c);
        i += 1;
    }
    flush(&mut buf, &mut pieces);

    // Merge consecutive `Text(ident) "*" Text(num)` or `Text(num) "*" Text(ident)`
    // into ScaledReg, and lone register identifiers into Reg.
    let mut merged: Vec<Piece> = Vec::new();
    let mut j = 0;
    while j < pieces.len() {
        if let Piece::Text(t) = &pieces[j] {
            let trimmed = t.trim();
            if j + 2 < pieces.len()
                && matches!(&pieces[j + 1], Piece::Text(op) if op.trim() == "*")
            {
                if let Piece::Text(rhs) = &pieces[j + 2] {
                    let rhs_trim = rhs.trim();
                    if let Some(reg) = register::lookup(trimmed) {
                        if let Ok(scale) = rhs_trim.trim_start_matches('+').parse::<i64>() {
                            merged.push(Piece::ScaledReg(reg, scale));
                            j += 3;
                            continue;
                        }
                    }
                    if let Some(reg) = register::lookup(rhs_trim) {
                        if let Ok(scale) = trimmed.trim_start_matches('+').parse::<i64>() {
                            merged.push(Piece::ScaledReg(reg, scale));
                            j += 3;
                            continue;
                        }
                    }
                }
            }
            let sign_stripped = trimmed.trim_start_matches('+').trim();
            if let Some(reg) = register::lookup(sign_stripped) {
                merged.push(Piece::Reg(reg));
                j += 1;
                continue;
            }
        }
        merged.push(pieces[j].clone());
        j += 1;
    }

    Ok((sreg, merged))
}

pub fn parse(
    phrase: &str,
    loc: SourceLoc,
    bits: BitsMode,
    resolver: Option<(&dyn LabelResolver, Option<&str>)>,
) -> Result<(MemResolveOutcome, Option<MemAddressDescription>), CompileError> {
    let (sreg, pieces) = split_phrase(phrase, loc)?;

    let mut base = None;
    let mut index = None;
    let mut scale = None;
    let mut remainder = String::new();

    for piece in pieces {
        match piece {
            Piece::ScaledReg(reg, s) => {
                if scale.is_some() {
                    return Err(CompileError::at(ErrorCode::SCALE_IS_ALREADY_DEFINED, loc));
                }
                let scale_u8 = u8::try_from(s).map_err(|_| {
                    CompileError::at(ErrorCode::INCORRECT_SCALE, loc).with("scale", s)
                })?;
                if ![1, 2, 4, 8].contains(&scale_u8) {
                    return Err(
                        CompileError::at(ErrorCode::INCORRECT_SCALE, loc).with("scale", scale_u8)
                    );
                }
                index = Some(reg);
                scale = Some(scale_u8);
            }
            Piece::Reg(reg) => {
                if base.is_none() {
                    base = Some(reg);
                } else if index.is_none() {
                    index = Some(reg);
                } else {
                    return Err(CompileError::at(ErrorCode::INCORRECT_MEM_EXPRESSION, loc));
                }
            }
            Piece::Text(t) => {
                remainder.push_str(&t);
            }
        }
    }

    if bits == BitsMode::Bits16 {
        let uses_32 = base.map_or(false, |r| r.size == 4) || index.map_or(false, |r| r.size == 4);
        if uses_32 || scale.map_or(false, |s| s != 1) {
            return Err(
                CompileError::at(ErrorCode::SCALE_INDEX_IS_UNSUPPORTED_IN_MODE, loc)
                    .with("mode", 16),
            );
        }
    }

    let displacement = match rpn::eval(&remainder, loc, resolver)? {
        EvalOutcome::Value(v) => v,
        EvalOutcome::Unresolved => {
            return Ok((MemResolveOutcome::Unresolved, None));
        }
    };

    let disp_byte_size = magnitude_size(displacement);
    let signed_disp_byte_size = crate::ast::min_signed_size(displacement).min(4);

    let desc = MemAddressDescription {
        sreg,
        base,
        index,
        scale,
        displacement,
        disp_byte_size,
        signed_disp_byte_size,
    };

    Ok((MemResolveOutcome::Resolved, Some(desc)))
}

fn magnitude_size(v: i64) -> u8 {
    let a = v.unsigned_abs();
    if a == 0 {
        0
    } else if a <= 0xFF {
        1
    } else if a <= 0xFFFF {
        2
    } else {
        4
    }
}

/// `(mod, rm)` lookup for the classic 16-bit addressing table (spec.md §4.4).
/// `disp_size` is the displacement's byte size as computed by the caller
/// (0, 1 or 2); `[bp]` with a zero displacement and pure `[disp16]` both
/// pick `rm=6` and are disambiguated here rather than by `disp_size` alone.
pub fn modrm16(
    base: Option<&Register>,
    index: Option<&Register>,
    disp_size: u8,
) -> Option<(u8, u8)> {
    let rm = base_index_rm(base, index)?;
    if base.is_none() && index.is_none() {
        // Pure `[disp16]`: always a 2-byte displacement, never collapsed to
        // `mod=00` with an implicit zero like the `[bp]` case below.
        return Some((0b00, rm));
    }
    Some(mode_for(rm, disp_size))
}

fn base_index_rm(base: Option<&Register>, index: Option<&Register>) -> Option<u8> {
    let pair = |b: &str, i: &str| -> bool {
        base.map_or(false, |r| r.name == b) && index.map_or(false, |r| r.name == i)
    };
    match (base, index) {
        (Some(_), Some(_)) => {
            if pair("bx", "si") || pair("si", "bx") {
                Some(0)
            } else if pair("bx", "di") || pair("di", "bx") {
                Some(1)
            } else if pair("bp", "si") || pair("si", "bp") {
                Some(2)
            } else if pair("bp", "di") || pair("di", "bp") {
                Some(3)
            } else {
                None
            }
        }
        (Some(b), None) => match b.name {
            "si" => Some(4),
            "di" => Some(5),
            "bp" => Some(6),
            "bx" => Some(7),
            _ => None,
        },
        (None, Some(i)) => match i.name {
            "si" => Some(4),
            "di" => Some(5),
            "bp" => Some(6),
            "bx" => Some(7),
            _ => None,
        },
        (None, None) => Some(6), // pure [disp16], forced 2-byte displacement below.
    }
}

fn mode_for(rm: u8, disp_size: u8) -> (u8, u8) {
    if rm == 6 && disp_size == 0 {
        // `[bp]`-with-zero-displacement and pure `[disp16]` share rm=6;
        // disambiguated by forcing a 1-byte zero displacement for the
        // base=bp case (spec.md §8 boundary behavior).
        return (0b01, 6);
    }
    match disp_size {
        0 => (0b00, rm),
        1 => (0b01, rm),
        _ => (0b10, rm),
    }
}

/// True if `(base, index)` with no displacement at all is actually `[bp]`
/// (as opposed to the `rm=6`/no-base-no-index pure-disp16 case), which needs
/// the explicit 1-byte zero displacement quirk above.
pub fn is_bp_only(base: Option<&Register>, index: Option<&Register>) -> bool {
    base.map_or(false, |r| r.name == "bp") && index.is_none()
}

/// 32-bit SIB-capable addressing decision (SPEC_FULL.md §4.4a).
pub struct Sib32 {
    pub mode: u8,
    pub rm: u8,
    pub sib: Option<(u8, u8, u8)>, // (scale_bits, index_code, base_code)
}

pub fn modrm32(
    base: Option<&Register>,
    index: Option<&Register>,
    scale: Option<u8>,
    disp_size: u8,
) -> Option<Sib32> {
    let scale_bits = crate::modrm::scale_to_sib_bits(scale.unwrap_or(1))?;

    match (base, index) {
        (Some(b), None) if scale.is_none() || scale == Some(1) => {
            if b.name == "esp" {
                // esp as base always needs a SIB byte (rm=100) with no index.
                let mode = if disp_size == 0 {
                    0b00
                } else if disp_size == 1 {
                    0b01
                } else {
                    0b10
                };
                return Some(Sib32 {
                    mode,
                    rm: 0b100,
                    sib: Some((0b00, 0b100, b.code)),
                });
            }
            if b.name == "ebp" && disp_size == 0 {
                return Some(Sib32 {
                    mode: 0b01,
                    rm: b.code,
                    sib: None,
                });
            }
            let mode = match disp_size {
                0 => 0b00,
                1 => 0b01,
                _ => 0b10,
            };
            Some(Sib32 {
                mode,
                rm: b.code,
                sib: None,
            })
        }
        (None, None) => Some(Sib32 {
            mode: 0b00,
            rm: 0b101,
            sib: None,
        }),
        (base, index) if base.is_some() || index.is_some() => {
            let base_code = base.map(|r| r.code);
            let index_code = index.map(|r| r.code);
            let (mode, needs_disp32_no_base) = match base {
                None => (0b00, true),
                Some(b) if b.name == "ebp" && disp_size == 0 => (0b01, false),
                Some(_) => match disp_size {
                    0 => (0b00, false),
                    1 => (0b01, false),
                    _ => (0b10, false),
                },
            };
            let sib_base = if needs_disp32_no_base {
                0b101
            } else {
                base_code.unwrap_or(0b101)
            };
            let sib_index = index_code.unwrap_or(0b100);
            Some(Sib32 {
                mode,
                rm: 0b100,
                sib: Some((scale_bits, sib_index, sib_base)),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::register;

    fn reg(name: &str) -> &'static Register {
        register::lookup(name).unwrap()
    }

    #[test]
    fn bx_si_no_disp() {
        assert_eq!(modrm16(Some(reg("bx")), Some(reg("si")), 0), Some((0b00, 0)));
    }

    #[test]
    fn bp_only_zero_disp_forces_one_byte() {
        assert_eq!(modrm16(Some(reg("bp")), None, 0), Some((0b01, 6)));
    }

    #[test]
    fn pure_disp16() {
        assert_eq!(modrm16(None, None, 2), Some((0b00, 6)));
    }

    #[test]
    fn swapped_base_index() {
        assert_eq!(modrm16(Some(reg("si")), Some(reg("bx")), 0), Some((0b00, 0)));
    }

    #[test]
    fn illegal_pair() {
        assert_eq!(modrm16(Some(reg("bx")), Some(reg("bp")), 0), None);
    }
}
