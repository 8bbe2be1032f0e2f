//! Binary source-map record layout (`--source-map` CLI option,
//! SPEC_FULL.md §6), unchanged from the teacher's `vasm::source_map`.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceMapItem {
    pub start_line: u32,
    pub line_count: u32,
}

pub type SourceMap = Vec<SourceMapItem>;
