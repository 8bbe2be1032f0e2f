//! Grammar-level tests for the pest directive parser (SPEC_FULL.md §6), in
//! the teacher's `vasm::test::pest` style: exact token spans for the small
//! atomic rules, `is_ok`/`is_err` checks for the composite statement rules
//! whose exact span bookkeeping isn't worth pinning down here.

use asm86_asm::parser::{Asm86Grammar, Rule};
use pest::*;

fn parses(rule: Rule, input: &str) -> bool {
    Asm86Grammar::parse(rule, input).is_ok()
}

#[test]
fn number_literals_accept_both_prefix_and_suffix_notation() {
    parses_to! {
        parser: Asm86Grammar,
        input: "0x1A",
        rule: Rule::number,
        tokens: [ number(0, 4) ]
    };
    parses_to! {
        parser: Asm86Grammar,
        input: "1Ah",
        rule: Rule::number,
        tokens: [ number(0, 3) ]
    };
    parses_to! {
        parser: Asm86Grammar,
        input: "0b101",
        rule: Rule::number,
        tokens: [ number(0, 5) ]
    };
    parses_to! {
        parser: Asm86Grammar,
        input: "101b",
        rule: Rule::number,
        tokens: [ number(0, 4) ]
    };
    parses_to! {
        parser: Asm86Grammar,
        input: "0o17",
        rule: Rule::number,
        tokens: [ number(0, 4) ]
    };
    parses_to! {
        parser: Asm86Grammar,
        input: "17o",
        rule: Rule::number,
        tokens: [ number(0, 3) ]
    };
    parses_to! {
        parser: Asm86Grammar,
        input: "42",
        rule: Rule::number,
        tokens: [ number(0, 2) ]
    };
    parses_to! {
        parser: Asm86Grammar,
        input: "-5",
        rule: Rule::number,
        tokens: [ number(0, 2) ]
    };
}

#[test]
fn ident_accepts_leading_underscore_and_dot() {
    parses_to! {
        parser: Asm86Grammar,
        input: "start_1",
        rule: Rule::ident,
        tokens: [ ident(0, 7) ]
    };
    parses_to! {
        parser: Asm86Grammar,
        input: ".loop",
        rule: Rule::ident,
        tokens: [ ident(0, 5) ]
    };
    fails_with! {
        parser: Asm86Grammar,
        input: "1bad",
        rule: Rule::ident,
        positives: vec![Rule::ident],
        negatives: vec![],
        pos: 0
    };
}

#[test]
fn mem_operand_captures_bracketed_text_as_raw_phrase() {
    parses_to! {
        parser: Asm86Grammar,
        input: "[si+0x5]",
        rule: Rule::mem_operand,
        tokens: [ mem_operand(0, 8, [ mem_phrase(1, 7) ]) ]
    };
}

#[test]
fn instr_stmt_accepts_prefixes_and_multiple_operands() {
    assert!(parses(Rule::instr_stmt, "mov ax, bx"));
    assert!(parses(Rule::instr_stmt, "rep movsb"));
    assert!(parses(Rule::instr_stmt, "lock inc byte [bx]"));
    assert!(parses(Rule::instr_stmt, "jmp short target"));
    assert!(parses(Rule::instr_stmt, "nop"));
}

#[test]
fn directives_require_matching_brackets() {
    assert!(parses(Rule::directive, "[org 0x7C00]"));
    assert!(parses(Rule::directive, "[bits 32]"));
    assert!(!parses(Rule::directive, "[org 0x7C00"));
}

#[test]
fn equ_and_data_statements_parse() {
    assert!(parses(Rule::define_stmt, "WIDTH equ 4"));
    assert!(parses(Rule::define_stmt, "db 1, 2, 3"));
    assert!(parses(Rule::define_stmt, "dw WIDTH, 0x10"));
    assert!(parses(Rule::define_stmt, "db \"hi\", 0"));
}

#[test]
fn times_stmt_wraps_an_instruction() {
    assert!(parses(Rule::times_stmt, "times 3 nop"));
    assert!(parses(Rule::times_stmt, "times COUNT db 0"));
}

#[test]
fn label_def_requires_trailing_colon() {
    assert!(parses(Rule::label_def, "start:"));
    assert!(!parses(Rule::label_def, "start"));
}

#[test]
fn full_program_parses_labels_directives_and_instructions() {
    let src = "[org 0x7C00]\nstart:\n  mov ax, 0x1234\n  jmp start\n";
    assert!(Asm86Grammar::parse(Rule::program, src).is_ok());
}

#[test]
fn unterminated_string_is_a_syntax_error() {
    assert!(!parses(Rule::string_lit, "\"unterminated"));
}
