//! Operand matcher (spec.md §4.3).
//!
//! Given one schema and one instruction's already-parsed operand list,
//! decide whether the schema applies under the active CPU target, bits
//! mode, branch-addressing hint, and (for relative-branch schemas) the
//! instruction's provisional end address.
//!
//! Labels are matched pessimistically (spec.md §4.3): an unresolved `Label`
//! satisfies every size-bearing matcher except the ones with a narrower
//! alternative listed later in the registry — `rel8` (needs an explicit
//! `short` hint or a resolved, in-range distance) and `ib_s` (needs a
//! resolved value that fits sign-extended in one byte). Those asymmetries
//! are what make ordinary first-match iteration over the registry (smaller
//! schemas listed first) choose the pessimistic *widest* encoding on the
//! first pass and the tightest available encoding once labels resolve — no
//! separate "pessimistic mode" flag is needed elsewhere in the matcher.

use crate::ast::{BranchAddressingType, MemAddressDescription, Operand};
use crate::cpu::{BitsMode, CpuTarget};
use crate::register::Register;
use crate::rpn::LabelResolver;
use crate::schema::{ArgMatcher, Schema};

pub struct MatchContext<'a> {
    pub cpu: CpuTarget,
    pub bits: BitsMode,
    pub branch: Option<BranchAddressingType>,
    /// Provisional address of the byte following this instruction, used for
    /// `rel8`/`rel16` range checks (spec.md §4.5 "next_instruction_start").
    pub next_addr: u32,
    pub resolver: Option<(&'a dyn LabelResolver, Option<&'a str>)>,
}

pub fn schema_applies(schema: &Schema, operands: &[Operand], ctx: &MatchContext) -> bool {
    if schema.target_cpu_min > ctx.cpu {
        return false;
    }
    if schema.arg_matchers.len() != operands.len() {
        return false;
    }
    schema
        .arg_matchers
        .iter()
        .zip(operands.iter())
        .all(|(m, op)| matcher_accepts(*m, op, ctx))
}

fn is_gpr(r: &Register, size: u8) -> bool {
    !r.segment && !r.x87 && r.size == size
}

fn resolve_label(name: &str, ctx: &MatchContext) -> Option<i64> {
    let (resolver, scope) = ctx.resolver?;
    resolver.resolve(name, scope)
}

fn rel_fits(distance: i64, bytes: u8) -> bool {
    match bytes {
        1 => distance >= i8::MIN as i64 && distance <= i8::MAX as i64,
        2 => distance >= i16::MIN as i64 && distance <= i16::MAX as i64,
        _ => true,
    }
}

fn matcher_accepts(m: ArgMatcher, op: &Operand, ctx: &MatchContext) -> bool {
    match m {
        ArgMatcher::Al => matches!(op, Operand::Register(r) if r.name == "al"),
        ArgMatcher::Ah => matches!(op, Operand::Register(r) if r.name == "ah"),
        ArgMatcher::Ax => matches!(op, Operand::Register(r) if r.name == "ax"),
        ArgMatcher::Eax => matches!(op, Operand::Register(r) if r.name == "eax"),
        ArgMatcher::Cl => matches!(op, Operand::Register(r) if r.name == "cl"),
        ArgMatcher::Dx => matches!(op, Operand::Register(r) if r.name == "dx"),
        ArgMatcher::Rb => matches!(op, Operand::Register(r) if is_gpr(r, 1)),
        ArgMatcher::Rw => matches!(op, Operand::Register(r) if is_gpr(r, 2)),
        ArgMatcher::Rd => matches!(op, Operand::Register(r) if is_gpr(r, 4)),
        ArgMatcher::Sr => matches!(op, Operand::Register(r) if r.segment),
        ArgMatcher::St => matches!(op, Operand::Register(r) if r.x87 && r.code == 0),
        ArgMatcher::Sti => matches!(op, Operand::Register(r) if r.x87),
        ArgMatcher::Rmb => reg_or_mem(op, 1),
        ArgMatcher::Rmw => reg_or_mem(op, 2),
        ArgMatcher::Rmd => reg_or_mem(op, 4),
        ArgMatcher::Mb => mem_only(op, 1),
        ArgMatcher::Mw => mem_only(op, 2),
        ArgMatcher::Md => mem_only(op, 4),
        ArgMatcher::Ib => imm_fits(op, 1, ctx),
        ArgMatcher::Iw => imm_fits(op, 2, ctx),
        ArgMatcher::Id => imm_fits(op, 4, ctx),
        ArgMatcher::IbS => imm_sign_extends(op, ctx),
        ArgMatcher::Imm1 => matches!(op, Operand::Number(n) if n.value == 1),
        ArgMatcher::Rel8 => rel_matches(op, 1, ctx),
        ArgMatcher::Rel16 => rel_matches(op, 2, ctx),
        ArgMatcher::NearPtr => near_or_far(op),
        ArgMatcher::FarPtr => far_ptr_matches(op),
        ArgMatcher::Moffs => moffs_matches(op),
    }
}

fn reg_or_mem(op: &Operand, size: u8) -> bool {
    match op {
        Operand::Register(r) => is_gpr(r, size),
        Operand::Memory(m) => match m.size {
            Some(s) => s == size,
            None => true, // implicit-size operands are ≤ the matcher's size (spec.md §4.3)
        },
        Operand::Label(_) => true,
        _ => false,
    }
}

fn mem_only(op: &Operand, size: u8) -> bool {
    match op {
        Operand::Memory(m) => match m.size {
            Some(s) => s == size,
            None => true,
        },
        _ => false,
    }
}

fn imm_fits(op: &Operand, size: u8, ctx: &MatchContext) -> bool {
    match op {
        Operand::Number(n) => n.size <= size,
        Operand::Label(_) => true,
        Operand::SegMem(_) => false,
        _ => {
            let _ = ctx;
            false
        }
    }
}

fn imm_sign_extends(op: &Operand, ctx: &MatchContext) -> bool {
    match op {
        Operand::Number(n) => n.signed_size <= 1,
        Operand::Label(l) => match resolve_label(&l.name, ctx) {
            Some(value) => rel_fits(value, 1),
            // Unresolved: the real value isn't known yet, so only the
            // pessimistically-widest (`Iw`/`Id`) form is safe.
            None => false,
        },
        _ => false,
    }
}

fn rel_matches(op: &Operand, size: u8, ctx: &MatchContext) -> bool {
    let required = match ctx.branch {
        Some(BranchAddressingType::Short) => 1,
        Some(BranchAddressingType::Near) => 2,
        Some(BranchAddressingType::Far) => return false,
        None => size,
    };
    if required != size {
        return false;
    }
    match op {
        Operand::Label(l) => match resolve_label(&l.name, ctx) {
            Some(target) => rel_fits(target - ctx.next_addr as i64, size),
            None => {
                // Unresolved: only the widest (rel16) form is pessimistically
                // safe, unless the user forced `short` above.
                size == 2 || ctx.branch == Some(BranchAddressingType::Short)
            }
        },
        Operand::Number(n) => rel_fits(n.value - ctx.next_addr as i64, size),
        _ => false,
    }
}

fn near_or_far(op: &Operand) -> bool {
    match op {
        Operand::Register(r) => is_gpr(r, 2) || is_gpr(r, 4),
        Operand::Memory(_) => true,
        _ => false,
    }
}

fn far_ptr_matches(op: &Operand) -> bool {
    matches!(op, Operand::SegMem(_)) || matches!(op, Operand::Memory(_))
}

fn moffs_matches(op: &Operand) -> bool {
    match op {
        Operand::Memory(m) => match &m.resolved {
            Some(desc) => is_pure_offset(desc),
            None => true,
        },
        _ => false,
    }
}

fn is_pure_offset(desc: &MemAddressDescription) -> bool {
    desc.base.is_none() && desc.index.is_none()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{LabelOperand, MemoryOperand, NumberOperand};
    use crate::register;

    struct FixedResolver(i64);
    impl LabelResolver for FixedResolver {
        fn resolve(&self, _name: &str, _scope: Option<&str>) -> Option<i64> {
            Some(self.0)
        }
    }

    fn ctx(next_addr: u32) -> MatchContext<'static> {
        MatchContext {
            cpu: CpuTarget::I486,
            bits: BitsMode::Bits16,
            branch: None,
            next_addr,
            resolver: None,
        }
    }

    #[test]
    fn rb_accepts_byte_register_only() {
        let al = Operand::Register(register::lookup("al").unwrap());
        let ax = Operand::Register(register::lookup("ax").unwrap());
        assert!(matcher_accepts(ArgMatcher::Rb, &al, &ctx(0)));
        assert!(!matcher_accepts(ArgMatcher::Rb, &ax, &ctx(0)));
    }

    #[test]
    fn target_cpu_min_gates_schema() {
        let s = crate::schema::schema("shl", &[ArgMatcher::Rmw, ArgMatcher::Ib], &[]);
        let s386 = Schema {
            target_cpu_min: CpuTarget::I386,
            ..s
        };
        let operands = [
            Operand::Register(register::lookup("ax").unwrap()),
            Operand::Number(NumberOperand::new(1, 1)),
        ];
        let mut c = ctx(0);
        c.cpu = CpuTarget::I286;
        assert!(!schema_applies(&s386, &operands, &c));
        c.cpu = CpuTarget::I386;
        assert!(schema_applies(&s386, &operands, &c));
    }

    #[test]
    fn unresolved_label_widens_to_rel16_unless_forced_short() {
        let target = Operand::Label(LabelOperand {
            name: "dest".to_owned(),
        });
        let mut c = ctx(10);
        assert!(!matcher_accepts(ArgMatcher::Rel8, &target, &c));
        assert!(matcher_accepts(ArgMatcher::Rel16, &target, &c));

        c.branch = Some(BranchAddressingType::Short);
        assert!(matcher_accepts(ArgMatcher::Rel8, &target, &c));
    }

    #[test]
    fn resolved_label_in_range_prefers_rel8() {
        let target = Operand::Label(LabelOperand {
            name: "dest".to_owned(),
        });
        let resolver = FixedResolver(5);
        let mut c = ctx(3);
        c.resolver = Some((&resolver, None));
        assert!(matcher_accepts(ArgMatcher::Rel8, &target, &c));
    }

    #[test]
    fn unresolved_label_rejects_sign_extended_immediate() {
        let value = Operand::Label(LabelOperand {
            name: "forward_label".to_owned(),
        });
        assert!(!matcher_accepts(ArgMatcher::IbS, &value, &ctx(0)));
    }

    #[test]
    fn resolved_label_out_of_range_rejects_sign_extended_immediate() {
        let value = Operand::Label(LabelOperand {
            name: "forward_label".to_owned(),
        });
        let resolver = FixedResolver(200);
        let mut c = ctx(0);
        c.resolver = Some((&resolver, None));
        assert!(!matcher_accepts(ArgMatcher::IbS, &value, &c));
    }

    #[test]
    fn resolved_label_in_range_accepts_sign_extended_immediate() {
        let value = Operand::Label(LabelOperand {
            name: "forward_label".to_owned(),
        });
        let resolver = FixedResolver(-1);
        let mut c = ctx(0);
        c.resolver = Some((&resolver, None));
        assert!(matcher_accepts(ArgMatcher::IbS, &value, &c));
    }

    #[test]
    fn near_ptr_accepts_register_or_memory_but_not_immediate() {
        let ax = Operand::Register(register::lookup("ax").unwrap());
        let mem = Operand::Memory(MemoryOperand {
            phrase: "bx".to_owned(),
            size: Some(2),
            resolved: None,
        });
        let imm = Operand::Number(NumberOperand::new(1, 1));
        assert!(matcher_accepts(ArgMatcher::NearPtr, &ax, &ctx(0)));
        assert!(matcher_accepts(ArgMatcher::NearPtr, &mem, &ctx(0)));
        assert!(!matcher_accepts(ArgMatcher::NearPtr, &imm, &ctx(0)));
    }

    #[test]
    fn moffs_rejects_base_or_index_but_accepts_pure_offset() {
        let with_base = Operand::Memory(MemoryOperand {
            phrase: "si+0x5".to_owned(),
            size: Some(1),
            resolved: Some(MemAddressDescription {
                sreg: None,
                base: Some(register::lookup("si").unwrap()),
                index: None,
                scale: None,
                displacement: 5,
                disp_byte_size: 1,
                signed_disp_byte_size: 1,
            }),
        });
        assert!(!moffs_matches(&with_base));

        let pure_offset = Operand::Memory(MemoryOperand {
            phrase: "0x1234".to_owned(),
            size: Some(1),
            resolved: Some(MemAddressDescription {
                sreg: None,
                base: None,
                index: None,
                scale: None,
                displacement: 0x1234,
                disp_byte_size: 2,
                signed_disp_byte_size: 2,
            }),
        });
        assert!(moffs_matches(&pure_offset));
    }
}
