//! Front end for the [asm86](../asm86/index.html) assembler core.
//!
//! The pipeline is preprocess ([`preprocessor`]) -> parse ([`parser`]) ->
//! hand the resulting [`asm86::Ast`] to [`asm86::compile`]. This crate owns
//! everything spec.md calls an "external collaborator": the preprocessor
//! subset, the pest grammar and directive parser, and the CLI binary
//! (`src/main.rs`).

mod preprocessor;
pub mod source_map;

pub mod parser;

use asm86::error::SourceLoc;
use asm86::{ast, CompileError, CpuTarget, Image};
pub use source_map::{SourceMap, SourceMapItem};

#[derive(Debug)]
pub enum Error {
    Preprocess(String),
    Compile(CompileError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Preprocess(msg) => write!(f, "preprocessing failed: {}", msg),
            Error::Compile(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Error {
        Error::Compile(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Assemble a full source file into a machine-code image plus a source map.
pub fn assemble(input: &str) -> Result<(Image, SourceMap)> {
    assemble_with_cpu(input, CpuTarget::default())
}

pub fn assemble_with_cpu(input: &str, cpu: CpuTarget) -> Result<(Image, SourceMap)> {
    let expanded = preprocessor::preprocess(input).map_err(Error::Preprocess)?;
    let nodes = parser::parse(&expanded)?;
    let map = build_source_map(&nodes);
    let image = asm86::compile(&nodes, cpu)?;
    Ok((image, map))
}

/// One entry per `Instruction`/`Times` statement, in source order, mirroring
/// the teacher's `vasm::source_map` (one record per assembled unit; labels,
/// directives and `equ`/data declarations contribute no record). A `times`
/// expansion is recorded as a single entry for its one source line rather
/// than one entry per repetition.
fn build_source_map(nodes: &[ast::Node]) -> SourceMap {
    nodes
        .iter()
        .filter_map(|n| match n {
            ast::Node::Instruction(instr) => Some(loc_to_item(instr.loc)),
            ast::Node::Times(t) => Some(loc_to_item(t.loc)),
            _ => None,
        })
        .collect()
}

fn loc_to_item(loc: SourceLoc) -> SourceMapItem {
    SourceMapItem {
        start_line: loc.row,
        line_count: 1,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn assembles_simple_program() {
        let src = "mov al, 0x12\nmov ax, 0x1234\n";
        let (image, map) = assemble(src).unwrap();
        assert_eq!(image.bytes, vec![0xB0, 0x12, 0xB8, 0x34, 0x12]);
        assert_eq!(map.len(), 2);
        assert_eq!(map[0].start_line, 1);
        assert_eq!(map[1].start_line, 2);
    }

    #[test]
    fn labels_and_org() {
        let src = "[org 0x7C00]\nstart:\n  jmp start\n";
        let (image, _) = assemble(src).unwrap();
        assert_eq!(image.labels["start"], 0x7C00);
        assert_eq!(image.origin, 0x7C00);
    }

    #[test]
    fn equ_and_data() {
        let src = "WIDTH equ 4\ndb WIDTH, 1, 2\n";
        let (image, _) = assemble(src).unwrap();
        assert_eq!(image.bytes, vec![4, 1, 2]);
    }

    #[test]
    fn times_expansion() {
        let src = "times 3 nop\n";
        let (image, _) = assemble(src).unwrap();
        assert_eq!(image.bytes, vec![0x90, 0x90, 0x90]);
    }

    #[test]
    fn moffs_vs_general_memory_form() {
        let src = "mov al, byte [si+0x5]\n";
        let (image, _) = assemble(src).unwrap();
        assert_eq!(image.bytes, vec![0x8A, 0x44, 0x05]);
    }

    #[test]
    fn preprocessor_define_expands() {
        let src = "%define COUNT 2\ntimes COUNT nop\n";
        let (image, _) = assemble(src).unwrap();
        assert_eq!(image.bytes, vec![0x90, 0x90]);
    }
}
