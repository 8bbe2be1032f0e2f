//! AST node and operand types (spec.md §3).
//!
//! AST nodes are produced by the front-end parser (`asm86-asm`) and mutated
//! only by the layout engine, which rewrites `InstructionNode::operands`,
//! `has_labeled_args` and `unresolved_args` once real addresses are known
//! (spec.md §4.7, step 2).

use crate::error::SourceLoc;
use crate::register::Register;

/// Tagged operand union (spec.md §3, §9 "Tagged operand union").
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Register(&'static Register),
    Number(NumberOperand),
    Memory(MemoryOperand),
    SegMem(SegMemOperand),
    Label(LabelOperand),
}

impl Operand {
    /// Byte size of the operand, where known. `None` for an unsized memory
    /// operand or an unresolved label.
    pub fn byte_size(&self) -> Option<u8> {
        match self {
            Operand::Register(r) => Some(r.size),
            Operand::Number(n) => Some(n.size),
            Operand::Memory(m) => m.size,
            Operand::SegMem(s) => Some(s.offset_size),
            Operand::Label(_) => None,
        }
    }

    /// True once the operand no longer references an unresolved label
    /// (spec.md §4.3: labels are treated pessimistically until resolved).
    pub fn is_resolved(&self) -> bool {
        match self {
            Operand::Label(_) => false,
            Operand::Memory(m) => m.resolved.is_some(),
            _ => true,
        }
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Operand::Label(_))
    }
}

/// Minimal number of bytes (1, 2, 4 or 8) needed to represent `value` such
/// that sign-extending that many low bytes reproduces `value` exactly.
pub fn min_signed_size(value: i64) -> u8 {
    if value >= i8::MIN as i64 && value <= i8::MAX as i64 {
        1
    } else if value >= i16::MIN as i64 && value <= i16::MAX as i64 {
        2
    } else if value >= i32::MIN as i64 && value <= i32::MAX as i64 {
        4
    } else {
        8
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NumberOperand {
    pub value: i64,
    /// Declared byte size: explicit size-override cast, or inferred from
    /// magnitude/context during operand parsing (spec.md §4.2).
    pub size: u8,
    /// Minimal byte size the value fits in under sign extension
    /// (spec.md §4.3 `ib_s` matcher).
    pub signed_size: u8,
}

impl NumberOperand {
    pub fn new(value: i64, size: u8) -> NumberOperand {
        NumberOperand {
            value,
            size,
            signed_size: min_signed_size(value),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MemoryOperand {
    /// Raw text between `[` and `]`, re-tokenized by the core (spec.md §4.4).
    pub phrase: String,
    /// Declared/deduced byte size of the pointed-to data (spec.md §4.2).
    pub size: Option<u8>,
    pub resolved: Option<MemAddressDescription>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemAddressDescription {
    pub sreg: Option<&'static Register>,
    pub base: Option<&'static Register>,
    pub index: Option<&'static Register>,
    pub scale: Option<u8>,
    pub displacement: i64,
    pub disp_byte_size: u8,
    pub signed_disp_byte_size: u8,
}

impl MemAddressDescription {
    pub fn is_moffset(&self) -> bool {
        self.base.is_none() && self.index.is_none()
    }

    /// True when a 32-bit register participates (requires SIB-capable mode).
    pub fn uses_32bit_regs(&self) -> bool {
        self.base.map_or(false, |r| r.size == 4) || self.index.map_or(false, |r| r.size == 4)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SegMemOperand {
    pub segment: u16,
    pub offset: i64,
    pub offset_size: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelOperand {
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchAddressingType {
    Short,
    Near,
    Far,
}

impl BranchAddressingType {
    /// Size in bytes the branch-addressing keyword implies for a trailing
    /// size-override (spec.md §4.2: doubled for `near`/`far`, since the
    /// override then means "segment:offset pair size").
    pub fn size_multiplier(self) -> u8 {
        match self {
            BranchAddressingType::Short => 1,
            BranchAddressingType::Near | BranchAddressingType::Far => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionPrefix {
    Lock,
    Rep,
    Repne,
}

impl InstructionPrefix {
    pub fn byte(self) -> u8 {
        match self {
            InstructionPrefix::Lock => 0xF0,
            InstructionPrefix::Rep => 0xF3,
            InstructionPrefix::Repne => 0xF2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstructionNode {
    pub mnemonic: String,
    pub prefixes: Vec<InstructionPrefix>,
    pub branch_addressing: Option<BranchAddressingType>,
    pub operands: Vec<Operand>,
    /// True while any operand is an unresolved `Label`.
    pub has_labeled_args: bool,
    /// True while a memory operand's displacement referenced a name the
    /// resolver did not know about yet (spec.md §4.4 step 4).
    pub unresolved_args: bool,
    pub loc: SourceLoc,
}

impl InstructionNode {
    pub fn refresh_resolution_flags(&mut self) {
        self.has_labeled_args = self.operands.iter().any(Operand::is_label);
        self.unresolved_args = self.operands.iter().any(|op| match op {
            Operand::Memory(m) => m.resolved.is_none(),
            _ => false,
        });
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelNode {
    pub name: String,
    pub loc: SourceLoc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefineKind {
    Byte,
    Word,
    Dword,
    /// `equ`: a named constant, contributes zero bytes to the image.
    Equ,
}

impl DefineKind {
    pub fn element_size(self) -> u8 {
        match self {
            DefineKind::Byte => 1,
            DefineKind::Word => 2,
            DefineKind::Dword => 4,
            DefineKind::Equ => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DefineItem {
    Number(i64),
    Bytes(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DefineNode {
    pub kind: DefineKind,
    pub name: Option<String>,
    pub items: Vec<DefineItem>,
    pub loc: SourceLoc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompilerOption {
    Org(u32),
    Bits(u32),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompilerOptionNode {
    pub option: CompilerOption,
    pub loc: SourceLoc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimesNode {
    pub count_expr: String,
    pub inner: Box<Node>,
    pub loc: SourceLoc,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Instruction(InstructionNode),
    Label(LabelNode),
    Define(DefineNode),
    CompilerOption(CompilerOptionNode),
    Times(TimesNode),
}

impl Node {
    pub fn loc(&self) -> SourceLoc {
        match self {
            Node::Instruction(n) => n.loc,
            Node::Label(n) => n.loc,
            Node::Define(n) => n.loc,
            Node::CompilerOption(n) => n.loc,
            Node::Times(n) => n.loc,
        }
    }
}

pub type Ast = Vec<Node>;
