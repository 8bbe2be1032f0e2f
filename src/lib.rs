//! Two-subsystem x86 assembler core: instruction matching/binary encoding
//! (schema registry, operand matcher, memory-operand parser, ModR/M/SIB
//! encoder, instruction encoder) and a two-pass layout engine with
//! instruction shrinking and `times` expansion.
//!
//! Front ends (lexer, preprocessor, directive parser) live outside this
//! crate and hand it an [`ast::Ast`]; this crate turns that into a flat
//! [`layout::Image`].

pub mod ast;
pub mod cpu;
pub mod encoder;
pub mod error;
pub mod layout;
pub mod matcher;
pub mod memaddr;
pub mod modrm;
pub mod register;
pub mod registry;
pub mod rpn;
pub mod schema;

pub use ast::Ast;
pub use cpu::CpuTarget;
pub use error::{CompileError, ErrorCode, Result};
pub use layout::{Image, LabelMap};
pub use rpn::LabelResolver;

/// Compile a parsed program into a flat machine-code image (spec.md §1, §4.7).
pub fn compile(ast: &Ast, cpu: CpuTarget) -> Result<Image> {
    layout::compile(ast, cpu)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{InstructionNode, NumberOperand, Operand};
    use crate::error::SourceLoc;

    fn loc() -> SourceLoc {
        SourceLoc::new(1, 1)
    }

    fn instr(mnemonic: &str, operands: Vec<Operand>) -> ast::Node {
        ast::Node::Instruction(InstructionNode {
            mnemonic: mnemonic.to_owned(),
            prefixes: vec![],
            branch_addressing: None,
            operands,
            has_labeled_args: false,
            unresolved_args: false,
            loc: loc(),
        })
    }

    #[test]
    fn mov_al_imm8() {
        let al = Operand::Register(register::lookup("al").unwrap());
        let ast = vec![instr("mov", vec![al, Operand::Number(NumberOperand::new(0x12, 1))])];
        let image = compile(&ast, CpuTarget::I486).unwrap();
        assert_eq!(image.bytes, vec![0xB0, 0x12]);
    }

    #[test]
    fn mov_ax_imm16() {
        let ax = Operand::Register(register::lookup("ax").unwrap());
        let ast = vec![instr(
            "mov",
            vec![ax, Operand::Number(NumberOperand::new(0x1234, 2))],
        )];
        let image = compile(&ast, CpuTarget::I486).unwrap();
        assert_eq!(image.bytes, vec![0xB8, 0x34, 0x12]);
    }

    #[test]
    fn times_nop() {
        let ast = vec![ast::Node::Times(ast::TimesNode {
            count_expr: "3".to_owned(),
            inner: Box::new(instr("nop", vec![])),
            loc: loc(),
        })];
        let image = compile(&ast, CpuTarget::I486).unwrap();
        assert_eq!(image.bytes, vec![0x90, 0x90, 0x90]);
    }
}
