//! Error taxonomy (spec.md §7). Errors are values: every fallible core
//! operation returns `Result<T, CompileError>` or, in the layout engine,
//! accumulates a `Vec<CompileError>`.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceLoc {
    pub row: u32,
    pub col: u32,
}

impl SourceLoc {
    pub fn new(row: u32, col: u32) -> SourceLoc {
        SourceLoc { row, col }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum ErrorCode {
    // Lexical / AST-shape
    UNKNOWN_TOKEN,
    SYNTAX_ERROR,
    INCORRECT_EXPRESSION,
    // Operand semantics
    OPERAND_MUST_BE_NUMBER,
    OPERAND_SIZES_MISMATCH,
    MISSING_MEM_OPERAND_SIZE,
    INVALID_INSTRUCTION_OPERAND,
    UNKNOWN_COMPILER_INSTRUCTION,
    UNKNOWN_OPERATION,
    REGISTER_IS_NOT_SEGMENT_REG,
    EXCEEDING_CASTED_NUMBER_SIZE,
    // Memory-expression
    SCALE_IS_ALREADY_DEFINED,
    INCORRECT_SCALE,
    INCORRECT_SCALE_MEM_PARAMS,
    INCORRECT_MEM_EXPRESSION,
    DISPLACEMENT_EXCEEDING_BYTE_SIZE,
    IMPOSSIBLE_MEM_REG,
    SCALE_INDEX_IS_UNSUPPORTED_IN_MODE,
    // Segmented memory
    INCORRECT_SEGMENTED_MEM_FORMAT,
    INCORRECT_SEGMENT_MEM_ARG_SIZE,
    INCORRECT_OFFSET_MEM_ARG_SIZE,
    OFFSET_MEM_ARG_SIZE_EXCEEDING_SIZE,
    // Encoding
    INVALID_ADDRESSING_MODE,
    MISSING_RM_BYTE_DEF,
    MISSING_MEM_ARG_DEF,
    MISSING_IMM_ARG_DEF,
    UNKNOWN_BINARY_SCHEMA_DEF,
    INCORRECT_SREG_OVERRIDE,
    CONFLICT_SREG_OVERRIDE,
    // Layout
    LABEL_ALREADY_DEFINED,
    MISSING_PARENT_LABEL,
    UNKNOWN_LABEL,
    ORIGIN_REDEFINED,
    UNSUPPORTED_COMPILER_MODE,
    UNABLE_TO_COMPILE_FILE,
    UNPERMITTED_NODE_IN_POSTPROCESS_MODE,
    INCORRECT_EQU_ARGS_COUNT,
    INCORRECT_TIMES_VALUE,
}

impl ErrorCode {
    /// Fixed translation-table message template (spec.md §7). `{name}`
    /// placeholders are substituted from `CompileError::params`.
    fn template(self) -> &'static str {
        use ErrorCode::*;
        match self {
            UNKNOWN_TOKEN => "Unknown token \"{text}\"!",
            SYNTAX_ERROR => "Syntax error: {detail}",
            INCORRECT_EXPRESSION => "Incorrect expression: {detail}",
            OPERAND_MUST_BE_NUMBER => "Operand must be a number!",
            OPERAND_SIZES_MISMATCH => "Operand sizes do not match!",
            MISSING_MEM_OPERAND_SIZE => "Missing size specifier for memory operand!",
            INVALID_INSTRUCTION_OPERAND => "Invalid operand for instruction \"{mnemonic}\"!",
            UNKNOWN_COMPILER_INSTRUCTION => {
                "No encoding of \"{mnemonic}\" accepts these operands!"
            }
            UNKNOWN_OPERATION => "Unknown operation \"{mnemonic}\"!",
            REGISTER_IS_NOT_SEGMENT_REG => "Register \"{reg}\" is not a segment register!",
            EXCEEDING_CASTED_NUMBER_SIZE => "Value {value} exceeds casted size of {size} byte(s)!",
            SCALE_IS_ALREADY_DEFINED => "Scale is already defined!",
            INCORRECT_SCALE => "Scale {scale} is not one of 1, 2, 4, 8!",
            INCORRECT_SCALE_MEM_PARAMS => "Incorrect scale/index combination in memory operand!",
            INCORRECT_MEM_EXPRESSION => "Incorrect memory expression!",
            DISPLACEMENT_EXCEEDING_BYTE_SIZE => {
                "Displacement of {addr} exceeds arg byte size ({n} bytes)!"
            }
            IMPOSSIBLE_MEM_REG => "Register combination {base}+{index} is not addressable!",
            SCALE_INDEX_IS_UNSUPPORTED_IN_MODE => {
                "Scaled index addressing is not supported in {mode}-bit mode!"
            }
            INCORRECT_SEGMENTED_MEM_FORMAT => "Incorrect segment:offset format!",
            INCORRECT_SEGMENT_MEM_ARG_SIZE => "Segment part must be 16 bits wide!",
            INCORRECT_OFFSET_MEM_ARG_SIZE => "Offset part has an incorrect size!",
            OFFSET_MEM_ARG_SIZE_EXCEEDING_SIZE => "Offset value {value} exceeds {size} byte(s)!",
            INVALID_ADDRESSING_MODE => "Invalid addressing mode!",
            MISSING_RM_BYTE_DEF => "Schema for \"{mnemonic}\" is missing an r/m byte definition!",
            MISSING_MEM_ARG_DEF => "Schema for \"{mnemonic}\" expected a memory argument!",
            MISSING_IMM_ARG_DEF => "Schema for \"{mnemonic}\" expected an immediate argument!",
            UNKNOWN_BINARY_SCHEMA_DEF => "Unknown binary template atom \"{atom}\"!",
            INCORRECT_SREG_OVERRIDE => "Incorrect segment override!",
            CONFLICT_SREG_OVERRIDE => "Conflicting segment override prefixes!",
            LABEL_ALREADY_DEFINED => "Label \"{label}\" is already defined!",
            MISSING_PARENT_LABEL => "Local label \"{label}\" has no preceding parent label!",
            UNKNOWN_LABEL => "Unknown label \"{label}\"!",
            ORIGIN_REDEFINED => "Origin is already defined!",
            UNSUPPORTED_COMPILER_MODE => "Unsupported bits mode \"{mode}\"!",
            UNABLE_TO_COMPILE_FILE => "Unable to compile file: layout did not converge after {passes} passes!",
            UNPERMITTED_NODE_IN_POSTPROCESS_MODE => "Node is not permitted at this point!",
            INCORRECT_EQU_ARGS_COUNT => "\"equ\" expects exactly one argument!",
            INCORRECT_TIMES_VALUE => "\"times\" count must be a non-negative integer!",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileError {
    pub code: ErrorCode,
    pub loc: Option<SourceLoc>,
    pub params: Vec<(&'static str, String)>,
}

impl CompileError {
    pub fn new(code: ErrorCode) -> CompileError {
        CompileError {
            code,
            loc: None,
            params: Vec::new(),
        }
    }

    pub fn at(code: ErrorCode, loc: SourceLoc) -> CompileError {
        CompileError {
            code,
            loc: Some(loc),
            params: Vec::new(),
        }
    }

    pub fn with(mut self, key: &'static str, value: impl fmt::Display) -> CompileError {
        self.params.push((key, value.to_string()));
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut message = self.code.template().to_owned();
        for (key, value) in &self.params {
            message = message.replace(&format!("{{{}}}", key), value);
        }
        if let Some(loc) = self.loc {
            write!(f, "{}: {}", loc, message)
        } else {
            write!(f, "{}", message)
        }
    }
}

impl std::error::Error for CompileError {}

pub type Result<T> = std::result::Result<T, CompileError>;
