//! Directive/AST-node parser (SPEC_FULL.md §6). Turns preprocessed source
//! text into `asm86::ast::Node`s via a pest grammar; the grammar itself
//! leaves bracketed memory phrases as raw text, which the core's
//! `asm86::memaddr` re-tokenizes (SPEC_FULL.md §4.4).

use asm86::ast::{
    BranchAddressingType, CompilerOption, CompilerOptionNode, DefineItem, DefineKind, DefineNode,
    InstructionNode, InstructionPrefix, LabelNode, LabelOperand, MemoryOperand, Node,
    NumberOperand, Operand,
};
use asm86::error::{CompileError, ErrorCode, SourceLoc};
use asm86::rpn::{self, EvalOutcome, LabelResolver};
use asm86::{ast, register};
use pest::iterators::Pair;
use pest::Parser;
use std::collections::HashMap;

#[derive(pest_derive::Parser)]
#[grammar = "grammar.pest"]
pub struct Asm86Grammar;

pub type PestError = pest::error::Error<Rule>;

struct ConstEnv<'a> {
    equs: &'a HashMap<String, i64>,
}

impl<'a> LabelResolver for ConstEnv<'a> {
    fn resolve(&self, name: &str, _scope: Option<&str>) -> Option<i64> {
        self.equs.get(name).copied()
    }
}

/// Parse a preprocessed source file into an AST.
pub fn parse(input: &str) -> Result<Vec<Node>, CompileError> {
    let mut pairs = Asm86Grammar::parse(Rule::program, input).map_err(|err| syntax_error(&err))?;
    let program = pairs.next().unwrap();

    let mut nodes = Vec::new();
    let mut equs: HashMap<String, i64> = HashMap::new();

    for line in program.into_inner() {
        if line.as_rule() == Rule::EOI {
            continue;
        }
        let loc = loc_of(&line);
        let mut parts = line.into_inner();
        let first = match parts.next() {
            Some(p) => p,
            None => continue,
        };

        let (label, statement) = if first.as_rule() == Rule::label_def {
            (Some(first), parts.next())
        } else {
            (None, Some(first))
        };

        if let Some(label_pair) = label {
            let name = label_pair.into_inner().next().unwrap().as_str().to_owned();
            nodes.push(Node::Label(LabelNode { name, loc }));
        }

        if let Some(stmt) = statement {
            build_statement(stmt, loc, &mut nodes, &mut equs)?;
        }
    }

    Ok(nodes)
}

fn build_statement(
    stmt: Pair<Rule>,
    loc: SourceLoc,
    nodes: &mut Vec<Node>,
    equs: &mut HashMap<String, i64>,
) -> Result<(), CompileError> {
    let inner = stmt.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::times_stmt => build_times(inner, loc, nodes, equs),
        Rule::directive => build_directive(inner, loc, nodes),
        Rule::define_stmt => build_define(inner, loc, nodes, equs),
        Rule::instr_stmt => {
            let instr = build_instr(inner, loc, equs)?;
            nodes.push(Node::Instruction(instr));
            Ok(())
        }
        _ => unreachable!(),
    }
}

fn build_times(
    pair: Pair<Rule>,
    loc: SourceLoc,
    nodes: &mut Vec<Node>,
    equs: &HashMap<String, i64>,
) -> Result<(), CompileError> {
    let mut inner = pair.into_inner();
    let count_expr = inner.next().unwrap().as_str().to_owned();
    let instr_pair = inner.next().unwrap();
    let instr = build_instr(instr_pair, loc, equs)?;
    nodes.push(Node::Times(ast::TimesNode {
        count_expr,
        inner: Box::new(Node::Instruction(instr)),
        loc,
    }));
    Ok(())
}

fn build_directive(
    pair: Pair<Rule>,
    loc: SourceLoc,
    nodes: &mut Vec<Node>,
) -> Result<(), CompileError> {
    let inner = pair.into_inner().next().unwrap();
    let rule = inner.as_rule();
    let number_pair = inner.into_inner().next().unwrap();
    let value = parse_literal(number_pair.as_str(), loc)? as u32;
    let option = match rule {
        Rule::org_directive => CompilerOption::Org(value),
        Rule::bits_directive => CompilerOption::Bits(value),
        _ => unreachable!(),
    };
    nodes.push(Node::CompilerOption(CompilerOptionNode { option, loc }));
    Ok(())
}

fn build_define(
    pair: Pair<Rule>,
    loc: SourceLoc,
    nodes: &mut Vec<Node>,
    equs: &mut HashMap<String, i64>,
) -> Result<(), CompileError> {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::equ_stmt => {
            let mut parts = inner.into_inner();
            let name = parts.next().unwrap().as_str().to_owned();
            let expr_pair = parts.next().unwrap();
            let value = eval_const_expr(expr_pair.as_str(), loc, equs)?;
            equs.insert(name.clone(), value);
            nodes.push(Node::Define(DefineNode {
                kind: DefineKind::Equ,
                name: Some(name),
                items: vec![DefineItem::Number(value)],
                loc,
            }));
            Ok(())
        }
        Rule::data_stmt => {
            let mut parts = inner.into_inner();
            let kw = parts.next().unwrap().as_str().to_ascii_lowercase();
            let kind = match kw.as_str() {
                "db" => DefineKind::Byte,
                "dw" => DefineKind::Word,
                "dd" => DefineKind::Dword,
                _ => unreachable!(),
            };
            let mut items = Vec::new();
            for item_pair in parts {
                let item_inner = item_pair.into_inner().next().unwrap();
                match item_inner.as_rule() {
                    Rule::string_lit => {
                        items.push(DefineItem::Bytes(unquote(item_inner.as_str()).into_bytes()));
                    }
                    Rule::expr => {
                        let value = eval_const_expr(item_inner.as_str(), loc, equs)?;
                        items.push(DefineItem::Number(value));
                    }
                    _ => unreachable!(),
                }
            }
            nodes.push(Node::Define(DefineNode {
                kind,
                name: None,
                items,
                loc,
            }));
            Ok(())
        }
        _ => unreachable!(),
    }
}

fn build_instr(
    pair: Pair<Rule>,
    loc: SourceLoc,
    equs: &HashMap<String, i64>,
) -> Result<InstructionNode, CompileError> {
    let mut prefixes = Vec::new();
    let mut mnemonic = String::new();
    let mut branch_addressing: Option<BranchAddressingType> = None;
    let mut operands = Vec::new();

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::prefix => prefixes.push(match part.as_str().to_ascii_lowercase().as_str() {
                "lock" => InstructionPrefix::Lock,
                "rep" | "repe" | "repz" => InstructionPrefix::Rep,
                "repne" | "repnz" => InstructionPrefix::Repne,
                _ => unreachable!(),
            }),
            Rule::mnemonic => mnemonic = part.as_str().to_owned(),
            Rule::operand => {
                let (op, branch) = build_operand(part, loc, equs)?;
                if branch.is_some() {
                    branch_addressing = branch;
                }
                operands.push(op);
            }
            _ => unreachable!(),
        }
    }

    let mut instr = InstructionNode {
        mnemonic,
        prefixes,
        branch_addressing,
        operands,
        has_labeled_args: false,
        unresolved_args: false,
        loc,
    };
    instr.refresh_resolution_flags();
    Ok(instr)
}

fn build_operand(
    pair: Pair<Rule>,
    loc: SourceLoc,
    equs: &HashMap<String, i64>,
) -> Result<(Operand, Option<BranchAddressingType>), CompileError> {
    let mut size_override: Option<u8> = None;
    let mut branch: Option<BranchAddressingType> = None;
    let mut body: Option<Pair<Rule>> = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::size_override => {
                size_override = Some(match part.as_str().to_ascii_lowercase().as_str() {
                    "byte" => 1,
                    "word" => 2,
                    "dword" => 4,
                    _ => unreachable!(),
                });
            }
            Rule::branch_kw => {
                branch = Some(match part.as_str().to_ascii_lowercase().as_str() {
                    "short" => BranchAddressingType::Short,
                    "near" => BranchAddressingType::Near,
                    "far" => BranchAddressingType::Far,
                    _ => unreachable!(),
                });
            }
            Rule::operand_body => body = Some(part),
            _ => unreachable!(),
        }
    }

    let inner = body.unwrap().into_inner().next().unwrap();
    let operand = match inner.as_rule() {
        Rule::mem_operand => {
            let phrase_pair = inner.into_inner().next().unwrap();
            Operand::Memory(MemoryOperand {
                phrase: phrase_pair.as_str().to_owned(),
                size: size_override,
                resolved: None,
            })
        }
        Rule::string_lit => {
            let text = unquote(inner.as_str());
            let mut bytes = text.bytes();
            let value = bytes.next().unwrap_or(0) as i64;
            if bytes.next().is_some() {
                return Err(CompileError::at(ErrorCode::OPERAND_MUST_BE_NUMBER, loc));
            }
            Operand::Number(NumberOperand::new(value, size_override.unwrap_or(1)))
        }
        Rule::expr => build_expr_operand(inner.as_str(), loc, equs, size_override)?,
        _ => unreachable!(),
    };

    Ok((operand, branch))
}

fn build_expr_operand(
    text: &str,
    loc: SourceLoc,
    equs: &HashMap<String, i64>,
    size_override: Option<u8>,
) -> Result<Operand, CompileError> {
    let trimmed = text.trim();
    if let Some(reg) = register::lookup(trimmed) {
        return Ok(Operand::Register(reg));
    }

    let resolver = ConstEnv { equs };
    match rpn::eval(trimmed, loc, Some((&resolver, None)))? {
        EvalOutcome::Value(v) => {
            let size = size_override.unwrap_or_else(|| ast::min_signed_size(v));
            Ok(Operand::Number(NumberOperand::new(v, size)))
        }
        EvalOutcome::Unresolved => {
            if is_bare_ident(trimmed) {
                Ok(Operand::Label(LabelOperand {
                    name: trimmed.to_owned(),
                }))
            } else {
                Err(CompileError::at(ErrorCode::INCORRECT_EXPRESSION, loc).with(
                    "detail",
                    format!("\"{}\" is not resolvable at parse time", trimmed),
                ))
            }
        }
    }
}

fn eval_const_expr(
    text: &str,
    loc: SourceLoc,
    equs: &HashMap<String, i64>,
) -> Result<i64, CompileError> {
    let resolver = ConstEnv { equs };
    match rpn::eval(text, loc, Some((&resolver, None)))? {
        EvalOutcome::Value(v) => Ok(v),
        EvalOutcome::Unresolved => Err(CompileError::at(ErrorCode::INCORRECT_EXPRESSION, loc)
            .with("detail", format!("\"{}\" is not a constant expression", text))),
    }
}

fn is_bare_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

fn unquote(s: &str) -> String {
    s[1..s.len() - 1].to_owned()
}

fn parse_literal(text: &str, loc: SourceLoc) -> Result<i64, CompileError> {
    let t = text.trim();
    let (body, radix) = if let Some(rest) = strip_ci_prefix(t, "0x") {
        (rest, 16)
    } else if let Some(rest) = strip_ci_prefix(t, "0b") {
        (rest, 2)
    } else if let Some(rest) = strip_ci_prefix(t, "0o") {
        (rest, 8)
    } else if let Some(rest) = strip_ci_suffix(t, "h") {
        (rest, 16)
    } else if let Some(rest) = strip_ci_suffix(t, "o") {
        (rest, 8)
    } else if let Some(rest) = strip_ci_suffix(t, "b") {
        (rest, 2)
    } else {
        (t, 10)
    };
    i64::from_str_radix(body, radix)
        .map_err(|e| CompileError::at(ErrorCode::SYNTAX_ERROR, loc).with("detail", e))
}

fn strip_ci_prefix<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

fn strip_ci_suffix<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if s.len() > suffix.len() && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix) {
        Some(&s[..s.len() - suffix.len()])
    } else {
        None
    }
}

fn loc_of(pair: &Pair<Rule>) -> SourceLoc {
    let (line, col) = pair.as_span().start_pos().line_col();
    SourceLoc::new(line as u32, col as u32)
}

fn syntax_error(err: &PestError) -> CompileError {
    let loc = match err.line_col {
        pest::error::LineColLocation::Pos((l, c)) => SourceLoc::new(l as u32, c as u32),
        pest::error::LineColLocation::Span((l, c), _) => SourceLoc::new(l as u32, c as u32),
    };
    CompileError::at(ErrorCode::SYNTAX_ERROR, loc).with("detail", err.to_string())
}
