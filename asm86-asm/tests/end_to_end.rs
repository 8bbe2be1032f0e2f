//! Top-level scenario tests (SPEC_FULL.md §8), in the teacher's flat
//! `vasm::test` style: one function per literal scenario or invariant,
//! no shared fixtures beyond `asm86_asm::assemble`/`assemble_with_cpu`.

use asm86::CpuTarget;
use asm86_asm::assemble;

#[test]
fn scenario_1_mov_al_immediate() {
    let (image, _) = assemble("mov al, 0x12\n").unwrap();
    assert_eq!(image.bytes, vec![0xB0, 0x12]);
}

#[test]
fn scenario_2_mov_ax_immediate() {
    let (image, _) = assemble("mov ax, 0x1234\n").unwrap();
    assert_eq!(image.bytes, vec![0xB8, 0x34, 0x12]);
}

#[test]
fn scenario_3_org_and_self_jump() {
    let src = "[bits 16]\n[org 0x7C00]\nstart: jmp start\n";
    let (image, _) = assemble(src).unwrap();
    assert_eq!(image.bytes, vec![0xEB, 0xFE]);
    assert_eq!(image.labels["start"], 0x7C00);
}

#[test]
fn scenario_4_moffs_vs_general_memory_form() {
    let src = "[bits 16]\nmov al, byte [si+0x5]\n";
    let (image, _) = assemble(src).unwrap();
    assert_eq!(image.bytes, vec![0x8A, 0x44, 0x05]);
}

#[test]
fn scenario_5_conditional_jump_shrinks_to_short_form() {
    let src = "jnc kill\nint3\nmov al, 2\nkill: mov al, 4\n";
    let (image, _) = assemble(src).unwrap();
    assert_eq!(image.bytes, vec![0x73, 0x03, 0xCC, 0xB0, 0x02, 0xB0, 0x04]);
    assert_eq!(image.labels["kill"], 5);
}

#[test]
fn scenario_6_times_nop() {
    let (image, _) = assemble("times 3 nop\n").unwrap();
    assert_eq!(image.bytes, vec![0x90, 0x90, 0x90]);
}

#[test]
fn boundary_short_jump_at_exactly_127_bytes() {
    let mut src = String::from("jmp short target\n");
    for _ in 0..127 {
        src.push_str("nop\n");
    }
    src.push_str("target: nop\n");
    let (image, _) = assemble(&src).unwrap();
    assert_eq!(&image.bytes[0..2], &[0xEB, 0x7F]);
}

#[test]
fn boundary_near_jump_at_128_bytes_without_forced_short() {
    let mut src = String::from("jmp target\n");
    for _ in 0..128 {
        src.push_str("nop\n");
    }
    src.push_str("target: nop\n");
    let (image, _) = assemble(&src).unwrap();
    assert_eq!(&image.bytes[0..3], &[0xE9, 0x80, 0x00]);
}

#[test]
fn boundary_mov_ax_immediate_is_always_16bit() {
    let (image, _) = assemble("mov ax, 2\n").unwrap();
    assert_eq!(image.bytes, vec![0xB8, 0x02, 0x00]);
}

#[test]
fn boundary_sub_uses_sign_extended_form() {
    let (image, _) = assemble("sub di, 1\n").unwrap();
    assert_eq!(image.bytes, vec![0x83, 0xEF, 0x01]);
}

#[test]
fn boundary_bp_with_zero_displacement_forces_disp16() {
    let (image, _) = assemble("mov al, byte [bp]\n").unwrap();
    assert_eq!(image.bytes, vec![0x8A, 0x46, 0x00]);
}

#[test]
fn boundary_scaled_index_rejected_in_16bit_mode() {
    let src = "[bits 16]\nmov al, byte [esi]\n";
    match assemble(src).unwrap_err() {
        asm86_asm::Error::Compile(err) => {
            assert_eq!(err.code, asm86::error::ErrorCode::SCALE_INDEX_IS_UNSUPPORTED_IN_MODE);
        }
        other => panic!("expected a Compile error, got {:?}", other),
    }
}

#[test]
fn determinism_same_input_same_output() {
    let src = "start: mov ax, start\njmp start\n";
    let (first, _) = assemble(src).unwrap();
    let (second, _) = assemble(src).unwrap();
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(first.labels, second.labels);
}

#[test]
fn origin_invariance_shifts_labels_not_bytes() {
    let no_org = "start: jmp start\n";
    let with_org = "[org 0x100]\nstart: jmp start\n";
    let (plain, _) = assemble(no_org).unwrap();
    let (shifted, _) = assemble(with_org).unwrap();
    assert_eq!(plain.bytes, shifted.bytes);
    assert_eq!(shifted.labels["start"] - plain.labels["start"], 0x100);
}

#[test]
fn label_after_times_block_points_past_expansion() {
    let src = "times 4 nop\nafter: mov al, 1\n";
    let (image, _) = assemble(src).unwrap();
    assert_eq!(image.labels["after"], 4);
    assert_eq!(&image.bytes[4..6], &[0xB0, 0x01]);
}

#[test]
fn label_before_unresolved_forward_reference_still_resolves() {
    // A label defined before a forward-referencing jump must not move once
    // the jump's own size is finalized two labels later.
    let src = "entry: nop\njmp fin\nfin: nop\n";
    let (image, _) = assemble(src).unwrap();
    assert_eq!(image.labels["entry"], 0);
    assert_eq!(image.labels["fin"], 3);
    assert_eq!(image.bytes, vec![0x90, 0xEB, 0x00, 0x90]);
}

#[test]
fn equ_constant_used_in_data_and_times() {
    let src = "WIDTH equ 3\ndb WIDTH\ntimes WIDTH nop\n";
    let (image, _) = assemble(src).unwrap();
    assert_eq!(image.bytes, vec![3, 0x90, 0x90, 0x90]);
}

#[test]
fn preprocessor_and_directives_combine() {
    let src = "%define COUNT 2\n[bits 16]\n[org 0x1000]\nstart:\ntimes COUNT nop\nend: jmp start\n";
    let (image, _) = assemble(src).unwrap();
    assert_eq!(image.labels["start"], 0x1000);
    assert_eq!(image.labels["end"], 0x1002);
    assert_eq!(image.bytes, vec![0x90, 0x90, 0xEB, 0xFC]);
}

#[test]
fn cpu_target_gates_386_only_instructions() {
    let src = "mov eax, 1\n";
    let old = assemble_with_cpu(src, CpuTarget::I286);
    assert!(old.is_err());
    let new = assemble_with_cpu(src, CpuTarget::I386).unwrap();
    assert_eq!(new.0.bytes, vec![0xB8, 0x01, 0x00, 0x00, 0x00]);
}

fn assemble_with_cpu(
    src: &str,
    cpu: CpuTarget,
) -> Result<(asm86::Image, asm86_asm::SourceMap), asm86_asm::Error> {
    asm86_asm::assemble_with_cpu(src, cpu)
}

#[test]
fn fixpoint_reencoding_matches_final_bytes() {
    // Re-running assemble over the *same* source after the label map has
    // settled must reproduce byte-for-byte the same image (spec.md §8's
    // fixpoint property restated as a black-box determinism check, since
    // the crate does not expose blob-level internals to this test crate).
    let src = "jnc kill\nint3\nmov al, 2\nkill: mov al, 4\n";
    let (first, _) = assemble(src).unwrap();
    let (second, _) = assemble(src).unwrap();
    assert_eq!(first.bytes, second.bytes);
}
