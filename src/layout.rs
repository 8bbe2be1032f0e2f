//! Two-pass layout engine (spec.md §4.7).
//!
//! Pass one walks the AST top to bottom with a pessimistic address cursor,
//! encoding every instruction against a worst-case schema match so sizes
//! never grow later. Pass two re-resolves labels and `times` counts,
//! re-matches and re-encodes anything that depended on them, and shrinks
//! the address map until it stops moving (or the pass budget runs out).

use std::collections::HashMap;

use crate::ast::{
    CompilerOption, DefineItem, DefineKind, InstructionNode, Node, Operand, TimesNode,
};
use crate::cpu::{BitsMode, CpuTarget};
use crate::encoder::{self, EncodeContext};
use crate::error::{CompileError, ErrorCode, Result};
use crate::matcher::{schema_applies, MatchContext};
use crate::memaddr::{self, MemResolveOutcome};
use crate::registry;
use crate::rpn::{self, EvalOutcome, LabelResolver};
use crate::schema::Schema;

const MAX_PASSES: u32 = 4;

/// Final output of a successful compile (spec.md §6).
#[derive(Debug, Clone)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub labels: LabelMap,
    pub origin: u32,
}

pub type LabelMap = HashMap<String, u32>;

#[derive(Clone)]
enum BlobKind {
    Instruction(InstructionNode),
    Times(TimesNode),
    Bytes,
}

#[derive(Clone)]
struct Blob {
    address: u32,
    kind: BlobKind,
    bytes: Vec<u8>,
}

struct Resolver<'a> {
    labels: &'a LabelMap,
    equs: &'a HashMap<String, i64>,
}

impl<'a> LabelResolver for Resolver<'a> {
    fn resolve(&self, name: &str, scope: Option<&str>) -> Option<i64> {
        if let Some(v) = self.equs.get(name) {
            return Some(*v);
        }
        if name.starts_with('.') {
            let full = format!("{}{}", scope.unwrap_or(""), name);
            return self.labels.get(&full).map(|a| *a as i64);
        }
        self.labels.get(name).map(|a| *a as i64)
    }
}

pub fn compile(ast: &[Node], initial_cpu: CpuTarget) -> Result<Image> {
    let mut cpu = initial_cpu;
    let mut bits = BitsMode::default();
    let mut origin: Option<u32> = None;
    let mut cursor: u32 = 0;
    let mut blobs: Vec<Blob> = Vec::new();
    let mut labels: LabelMap = LabelMap::new();
    let mut equs: HashMap<String, i64> = HashMap::new();
    let mut scope: Option<String> = None;

    // Pass 1: pessimistic sizing.
    for node in ast {
        match node {
            Node::CompilerOption(opt) => match opt.option {
                CompilerOption::Org(n) => {
                    if origin.is_some() {
                        return Err(CompileError::at(ErrorCode::ORIGIN_REDEFINED, opt.loc));
                    }
                    origin = Some(n);
                    cursor = n;
                }
                CompilerOption::Bits(n) => {
                    bits = BitsMode::from_u32(n).ok_or_else(|| {
                        CompileError::at(ErrorCode::UNSUPPORTED_COMPILER_MODE, opt.loc)
                            .with("mode", n)
                    })?;
                }
            },
            Node::Label(l) => {
                let full_name = full_label_name(&l.name, &scope);
                if labels.contains_key(&full_name) {
                    return Err(CompileError::at(ErrorCode::LABEL_ALREADY_DEFINED, l.loc)
                        .with("label", full_name));
                }
                labels.insert(full_name, cursor);
                if !l.name.starts_with('.') {
                    scope = Some(l.name.clone());
                } else if scope.is_none() {
                    return Err(CompileError::at(ErrorCode::MISSING_PARENT_LABEL, l.loc)
                        .with("label", l.name.clone()));
                }
            }
            Node::Define(d) => {
                if d.kind == DefineKind::Equ {
                    let name = d.name.clone().ok_or_else(|| {
                        CompileError::at(ErrorCode::INCORRECT_EQU_ARGS_COUNT, d.loc)
                    })?;
                    let value = match d.items.first() {
                        Some(DefineItem::Number(v)) => *v,
                        _ => {
                            return Err(CompileError::at(
                                ErrorCode::INCORRECT_EQU_ARGS_COUNT,
                                d.loc,
                            ))
                        }
                    };
                    equs.insert(name, value);
                    continue;
                }
                let bytes = encode_define(d)?;
                cursor += bytes.len() as u32;
                blobs.push(Blob {
                    address: cursor - bytes.len() as u32,
                    kind: BlobKind::Bytes,
                    bytes,
                });
            }
            Node::Instruction(instr) => {
                let mut instr = instr.clone();
                resolve_memory_operands_pessimistic(&mut instr, bits)?;
                instr.refresh_resolution_flags();
                let bytes = encode_pessimistic(&instr, cpu, bits, cursor)?;
                let len = bytes.len() as u32;
                blobs.push(Blob {
                    address: cursor,
                    kind: BlobKind::Instruction(instr),
                    bytes,
                });
                cursor += len;
            }
            Node::Times(times) => {
                // When the count is already resolvable from equs/labels seen
                // so far (the overwhelmingly common case: a literal or an
                // earlier `equ`), size the block now so later nodes in this
                // same pass get sane addresses instead of colliding with the
                // times block's own start address. `bytes` carries that
                // provisional length so pass two's fixpoint can compute a
                // shrink/grow delta the same way it does for instructions,
                // rather than assuming the block always starts at zero size.
                let provisional = {
                    let resolver = Resolver {
                        labels: &labels,
                        equs: &equs,
                    };
                    match rpn::eval(&times.count_expr, times.loc, Some((&resolver, None)))? {
                        EvalOutcome::Value(count) if count >= 0 => {
                            times_unit_size(&times.inner, cpu, bits, cursor)? * count as u32
                        }
                        _ => 0,
                    }
                };
                blobs.push(Blob {
                    address: cursor,
                    kind: BlobKind::Times(times.clone()),
                    bytes: vec![0u8; provisional as usize],
                });
                cursor += provisional;
            }
        }
    }

    // Pass 2: fixpoint iteration.
    for _pass in 0..MAX_PASSES {
        let mut needs_pass = false;
        let mut restart = false;

        let mut i = 0;
        while i < blobs.len() {
            let resolver = Resolver {
                labels: &labels,
                equs: &equs,
            };
            let address = blobs[i].address;
            let kind = blobs[i].kind.clone();

            match kind {
                BlobKind::Times(times) => {
                    let old_len = blobs[i].bytes.len() as u32;
                    let count = match rpn::eval(&times.count_expr, times.loc, Some((&resolver, None)))? {
                        EvalOutcome::Value(v) => v,
                        EvalOutcome::Unresolved => {
                            i += 1;
                            continue;
                        }
                    };
                    if count < 0 {
                        return Err(CompileError::at(ErrorCode::INCORRECT_TIMES_VALUE, times.loc));
                    }
                    let mut expanded = Vec::new();
                    let mut addr = address;
                    for _ in 0..count {
                        let (blob, len) = encode_one_at(&times.inner, addr, cpu, bits, &resolver)?;
                        expanded.push(blob);
                        addr += len;
                    }
                    let shrink_or_grow = addr as i64 - (address as i64) - old_len as i64;
                    blobs.remove(i);
                    for b in expanded.into_iter().rev() {
                        blobs.insert(i, b);
                    }
                    shift_following(&mut blobs, &mut labels, i + count as usize, shrink_or_grow, address);
                    needs_pass = true;
                    restart = true;
                    break;
                }
                BlobKind::Instruction(instr) => {
                    if !instr.has_labeled_args && !instr.unresolved_args {
                        i += 1;
                        continue;
                    }
                    let old_len = blobs[i].bytes.len() as u32;
                    let mut resolved_instr = instr.clone();
                    resolve_memory_operands(&mut resolved_instr, bits, &resolver);

                    let next_addr_guess = address + old_len;
                    let scope = scope_for(&labels, address);
                    let schema = match_schema(&resolved_instr, cpu, bits, next_addr_guess, Some((&resolver, scope.as_deref())))?;
                    let ctx = EncodeContext {
                        bits,
                        next_addr: next_addr_guess,
                        resolver: Some((&resolver, scope.as_deref())),
                        loc: resolved_instr.loc,
                    };
                    let new_bytes = encoder::encode(
                        schema,
                        &resolved_instr.prefixes,
                        &resolved_instr.operands,
                        &ctx,
                    )?;
                    let new_len = new_bytes.len() as u32;
                    resolved_instr.refresh_resolution_flags();
                    blobs[i].bytes = new_bytes;
                    blobs[i].kind = BlobKind::Instruction(resolved_instr);

                    if new_len != old_len {
                        let shrink = old_len as i64 - new_len as i64;
                        shift_following(&mut blobs, &mut labels, i + 1, -shrink, address);
                        needs_pass = true;
                    }
                    i += 1;
                }
                BlobKind::Bytes => {
                    i += 1;
                }
            }
        }

        if restart {
            continue;
        }
        if !needs_pass {
            let mut out = Vec::new();
            for b in &blobs {
                out.extend_from_slice(&b.bytes);
            }
            return Ok(Image {
                bytes: out,
                labels,
                origin: origin.unwrap_or(0),
            });
        }
    }

    Err(CompileError::new(ErrorCode::UNABLE_TO_COMPILE_FILE).with("passes", MAX_PASSES))
}

fn full_label_name(name: &str, scope: &Option<String>) -> String {
    if name.starts_with('.') {
        format!("{}{}", scope.clone().unwrap_or_default(), name)
    } else {
        name.to_owned()
    }
}

fn scope_for(labels: &LabelMap, address: u32) -> Option<String> {
    labels
        .iter()
        .filter(|(name, addr)| !name.starts_with('.') && **addr <= address)
        .max_by_key(|(_, addr)| **addr)
        .map(|(name, _)| name.clone())
}

fn shift_following(
    blobs: &mut [Blob],
    labels: &mut LabelMap,
    from_index: usize,
    delta: i64,
    after_address: u32,
) {
    for b in blobs.iter_mut().skip(from_index) {
        if b.address > after_address {
            b.address = (b.address as i64 + delta) as u32;
        }
    }
    for addr in labels.values_mut() {
        if *addr > after_address {
            *addr = (*addr as i64 + delta) as u32;
        }
    }
}

fn encode_one_at(
    node: &Node,
    address: u32,
    cpu: CpuTarget,
    bits: BitsMode,
    resolver: &Resolver,
) -> Result<(Blob, u32)> {
    match node {
        Node::Instruction(instr) => {
            let mut instr = instr.clone();
            resolve_memory_operands(&mut instr, bits, resolver);
            instr.refresh_resolution_flags();
            let schema = match_schema(&instr, cpu, bits, address, Some((resolver, None)))?;
            let ctx = EncodeContext {
                bits,
                next_addr: address,
                resolver: Some((resolver, None)),
                loc: instr.loc,
            };
            let bytes = encoder::encode(schema, &instr.prefixes, &instr.operands, &ctx)?;
            let len = bytes.len() as u32;
            Ok((
                Blob {
                    address,
                    kind: BlobKind::Instruction(instr),
                    bytes,
                },
                len,
            ))
        }
        Node::Define(d) => {
            let bytes = encode_define(d)?;
            let len = bytes.len() as u32;
            Ok((
                Blob {
                    address,
                    kind: BlobKind::Bytes,
                    bytes,
                },
                len,
            ))
        }
        _ => Err(CompileError::at(
            ErrorCode::UNPERMITTED_NODE_IN_POSTPROCESS_MODE,
            node.loc(),
        )),
    }
}

/// Pessimistic per-element byte size of a `times` body, used only to give
/// pass one's cursor a sane provisional advance (spec.md §4.7). Falls back to
/// zero for anything pass one can't size yet; pass two's fixpoint corrects
/// the resulting gap or overlap exactly as it does for instruction shrinking.
fn times_unit_size(inner: &Node, cpu: CpuTarget, bits: BitsMode, cursor: u32) -> Result<u32> {
    match inner {
        Node::Instruction(instr) => {
            let mut instr = instr.clone();
            resolve_memory_operands_pessimistic(&mut instr, bits)?;
            instr.refresh_resolution_flags();
            Ok(encode_pessimistic(&instr, cpu, bits, cursor)?.len() as u32)
        }
        Node::Define(d) => Ok(encode_define(d)?.len() as u32),
        _ => Ok(0),
    }
}

/// A resolver that answers every name with the largest representable
/// displacement, used only in pass one so constant-but-as-yet-unresolved
/// memory expressions still pick the pessimistic (widest) ModR/M encoding
/// (spec.md §4.7 "encode pessimistically, labels substituted by worst-case
/// placeholders").
struct WorstCaseResolver;

impl LabelResolver for WorstCaseResolver {
    fn resolve(&self, _name: &str, _scope: Option<&str>) -> Option<i64> {
        Some(i32::MAX as i64)
    }
}

fn resolve_memory_operands_pessimistic(instr: &mut InstructionNode, bits: BitsMode) -> Result<()> {
    for op in &mut instr.operands {
        if let Operand::Memory(m) = op {
            let (_outcome, desc) =
                memaddr::parse(&m.phrase, instr.loc, bits, Some((&WorstCaseResolver, None)))?;
            m.resolved = desc;
        }
    }
    Ok(())
}

fn resolve_memory_operands(instr: &mut InstructionNode, bits: BitsMode, resolver: &Resolver) {
    for op in &mut instr.operands {
        if let Operand::Memory(m) = op {
            if m.resolved.is_none() {
                if let Ok((MemResolveOutcome::Resolved, Some(desc))) =
                    memaddr::parse(&m.phrase, instr.loc, bits, Some((resolver, None)))
                {
                    m.resolved = Some(desc);
                }
            }
        }
    }
}

fn match_schema<'a>(
    instr: &InstructionNode,
    cpu: CpuTarget,
    bits: BitsMode,
    next_addr: u32,
    resolver: Option<(&'a dyn LabelResolver, Option<&'a str>)>,
) -> Result<&'static Schema> {
    let schemas = registry::lookup(&instr.mnemonic).ok_or_else(|| {
        CompileError::at(ErrorCode::UNKNOWN_OPERATION, instr.loc).with("mnemonic", &instr.mnemonic)
    })?;
    let ctx = MatchContext {
        cpu,
        bits,
        branch: instr.branch_addressing,
        next_addr,
        resolver,
    };
    schemas
        .iter()
        .find(|s| schema_applies(s, &instr.operands, &ctx))
        .ok_or_else(|| {
            // The pessimistic pass (no resolver yet) matches every
            // syntactically valid instruction against its widest schema
            // (spec.md §4.7); a miss there means the mnemonic/operand shape
            // itself is unencodable, not that a real value failed to fit.
            let code = if ctx.resolver.is_none() {
                ErrorCode::UNKNOWN_COMPILER_INSTRUCTION
            } else {
                ErrorCode::INVALID_INSTRUCTION_OPERAND
            };
            CompileError::at(code, instr.loc).with("mnemonic", &instr.mnemonic)
        })
}

fn encode_pessimistic(
    instr: &InstructionNode,
    cpu: CpuTarget,
    bits: BitsMode,
    address: u32,
) -> Result<Vec<u8>> {
    let schema = match_schema(instr, cpu, bits, address, None)?;
    let ctx = EncodeContext {
        bits,
        next_addr: address,
        resolver: None,
        loc: instr.loc,
    };
    encoder::encode(schema, &instr.prefixes, &instr.operands, &ctx)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{CompilerOptionNode, DefineItem, DefineNode, LabelNode, Operand};

    fn loc() -> crate::error::SourceLoc {
        crate::error::SourceLoc::new(1, 1)
    }

    fn instr(mnemonic: &str, operands: Vec<Operand>) -> Node {
        Node::Instruction(InstructionNode {
            mnemonic: mnemonic.to_owned(),
            prefixes: vec![],
            branch_addressing: None,
            operands,
            has_labeled_args: false,
            unresolved_args: false,
            loc: loc(),
        })
    }

    fn label_op(name: &str) -> Operand {
        Operand::Label(crate::ast::LabelOperand {
            name: name.to_owned(),
        })
    }

    #[test]
    fn org_sets_cursor_and_label_addresses() {
        let ast = vec![
            Node::CompilerOption(CompilerOptionNode {
                option: CompilerOption::Org(0x7C00),
                loc: loc(),
            }),
            Node::Label(LabelNode {
                name: "start".to_owned(),
                loc: loc(),
            }),
            instr("nop", vec![]),
        ];
        let image = compile(&ast, CpuTarget::I486).unwrap();
        assert_eq!(image.origin, 0x7C00);
        assert_eq!(image.labels["start"], 0x7C00);
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let ast = vec![
            Node::Label(LabelNode {
                name: "again".to_owned(),
                loc: loc(),
            }),
            Node::Label(LabelNode {
                name: "again".to_owned(),
                loc: loc(),
            }),
        ];
        let err = compile(&ast, CpuTarget::I486).unwrap_err();
        assert_eq!(err.code, ErrorCode::LABEL_ALREADY_DEFINED);
    }

    #[test]
    fn forward_branch_shrinks_from_rel16_to_rel8_once_resolved() {
        // `jmp short target` forces rel8 up front, so this exercises the
        // plain pessimistic-widen-then-shrink path for an unqualified `jmp`.
        let ast = vec![
            instr("jmp", vec![label_op("target")]),
            Node::Label(LabelNode {
                name: "target".to_owned(),
                loc: loc(),
            }),
            instr("nop", vec![]),
        ];
        let image = compile(&ast, CpuTarget::I486).unwrap();
        // jmp rel8 (EB xx) + nop, not the pessimistic jmp rel16 (E9 xx xx).
        assert_eq!(image.bytes, vec![0xEB, 0x00, 0x90]);
        assert_eq!(image.labels["target"], 2);
    }

    #[test]
    fn times_expansion_shifts_following_labels() {
        let ast = vec![
            Node::Times(TimesNode {
                count_expr: "3".to_owned(),
                inner: Box::new(instr("nop", vec![])),
                loc: loc(),
            }),
            Node::Label(LabelNode {
                name: "after".to_owned(),
                loc: loc(),
            }),
        ];
        let image = compile(&ast, CpuTarget::I486).unwrap();
        assert_eq!(image.bytes, vec![0x90, 0x90, 0x90]);
        assert_eq!(image.labels["after"], 3);
    }

    #[test]
    fn equ_constant_feeds_times_count() {
        // Front-end `equ`/data-item folding happens before the AST reaches
        // this crate; the one place the core itself still consults `equs`
        // is the `times` count expression (see `Resolver::resolve`).
        let ast = vec![
            Node::Define(DefineNode {
                kind: DefineKind::Equ,
                name: Some("WIDTH".to_owned()),
                items: vec![DefineItem::Number(2)],
                loc: loc(),
            }),
            Node::Times(TimesNode {
                count_expr: "WIDTH".to_owned(),
                inner: Box::new(instr("nop", vec![])),
                loc: loc(),
            }),
        ];
        let image = compile(&ast, CpuTarget::I486).unwrap();
        assert_eq!(image.bytes, vec![0x90, 0x90]);
    }

    #[test]
    fn unknown_mnemonic_is_an_error() {
        let ast = vec![instr("frobnicate", vec![])];
        let err = compile(&ast, CpuTarget::I486).unwrap_err();
        assert_eq!(err.code, ErrorCode::UNKNOWN_OPERATION);
    }

    #[test]
    fn known_mnemonic_with_no_matching_schema_is_unknown_compiler_instruction() {
        // "mov" exists, but no schema takes a single bare label operand.
        let ast = vec![instr("mov", vec![label_op("x")])];
        let err = compile(&ast, CpuTarget::I486).unwrap_err();
        assert_eq!(err.code, ErrorCode::UNKNOWN_COMPILER_INSTRUCTION);
    }
}

fn encode_define(d: &crate::ast::DefineNode) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for item in &d.items {
        match item {
            DefineItem::Number(v) => {
                let size = d.kind.element_size();
                for n in 0..size {
                    out.push(((*v >> (8 * n as u32)) & 0xFF) as u8);
                }
            }
            DefineItem::Bytes(b) => out.extend_from_slice(b),
        }
    }
    Ok(out)
}
