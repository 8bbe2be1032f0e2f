//! Schema registry (spec.md §3, §5): a process-wide, immutable set of
//! per-mnemonic schema lists, built as literal `'static` array data so
//! there is nothing to construct or lock at runtime.

mod alu;
mod incdec;
mod jump;
mod misc;
mod mov;
mod shift;
mod stack;
mod string;
mod unary;

use crate::schema::Schema;

/// All candidate schemas for `mnemonic`, in the registry's matching order
/// (spec.md §4.1: smaller encodings precede larger ones).
pub fn lookup(mnemonic: &str) -> Option<&'static [Schema]> {
    let mnemonic = mnemonic.to_ascii_lowercase();
    let mnemonic = mnemonic.as_str();
    alu::lookup(mnemonic)
        .or_else(|| mov::lookup(mnemonic))
        .or_else(|| shift::lookup(mnemonic))
        .or_else(|| incdec::lookup(mnemonic))
        .or_else(|| stack::lookup(mnemonic))
        .or_else(|| jump::lookup(mnemonic))
        .or_else(|| unary::lookup(mnemonic))
        .or_else(|| string::lookup(mnemonic))
        .or_else(|| misc::lookup(mnemonic))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_mnemonics_resolve() {
        for m in ["mov", "add", "jmp", "push", "pop", "inc", "shl", "nop", "int3"] {
            assert!(lookup(m).is_some(), "{m} should resolve");
        }
    }

    #[test]
    fn unknown_mnemonic_is_none() {
        assert!(lookup("frobnicate").is_none());
    }
}
