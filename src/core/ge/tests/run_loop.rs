// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Run loop tests
//! Diff handling, flush ordering and fast/slow path equivalence

use super::*;
use proptest::prelude::*;

fn no_end_flush() -> GeConfig {
    GeConfig {
        flush_on_end: false,
        ..GeConfig::default()
    }
}

#[test]
fn test_set_register_twice_has_zero_diff() {
    let mut regs = RegisterFile::new();

    assert_eq!(regs.set_register(opcodes::ZTEST, cmd(opcodes::ZTEST, 4)), 4);
    assert_eq!(regs.set_register(opcodes::ZTEST, cmd(opcodes::ZTEST, 4)), 0);
}

#[test]
fn test_reset_slots_hold_zero_payload() {
    let regs = RegisterFile::new();
    for opcode in 0..=255u8 {
        assert_eq!(regs.raw(opcode), (opcode as u32) << 24);
        assert_eq!(regs.diff(opcode, (opcode as u32) << 24), 0);
    }
}

#[test]
fn test_flush_before_on_change_flushes_once_with_old_value() {
    let mut h = Harness::with(no_end_flush(), RecordingBackend::capturing_registers());
    let mut words = vec![
        cmd(opcodes::FOGCOLOR, 0x12_3456),
        cmd(opcodes::FOGCOLOR, 0x12_3456),
        cmd(opcodes::FOGCOLOR, 0x65_4321),
    ];
    words.extend(finish());

    h.run_list(&words);

    // One flush per genuine change plus the one at FINISH
    assert_eq!(h.backend().flush_count(), 3);
    let flushed = h.backend().flushed_registers();
    assert_eq!(flushed[0][opcodes::FOGCOLOR as usize], cmd(opcodes::FOGCOLOR, 0));
    assert_eq!(flushed[1][opcodes::FOGCOLOR as usize], cmd(opcodes::FOGCOLOR, 0x12_3456));
    assert!(h.backend().dirty_seen().contains(DirtyFlags::FOGCOLOR));
}

#[test]
fn test_repeated_write_triggers_no_flush() {
    let mut h = Harness::with_config(no_end_flush());
    h.load(LIST, &[cmd(opcodes::ZTEST, 2), cmd(opcodes::ZTEST, 2)]);
    h.ge.enqueue(&h.mem, LIST, LIST + 8, false).unwrap();

    h.ge.run(&mut h.mem, 1);
    let after_first = h.backend().flush_count();
    h.ge.run(&mut h.mem, 1);

    assert_eq!(after_first, 1);
    assert_eq!(h.backend().flush_count(), 1);
}

fn check_execute_on_change_skips_repeats(stepping: bool) {
    let mut h = Harness::new();
    h.ge.engine_mut().set_stepping(stepping);
    let weight = cmd(opcodes::MORPHWEIGHT0, 0x3F_8000);
    h.load(LIST, &[weight, weight, weight]);
    h.ge.enqueue(&h.mem, LIST, LIST + 12, false).unwrap();

    h.ge.run(&mut h.mem, 1);
    assert_eq!(h.ge.engine().state().morph_weights[0], 1.0);

    // The handler would overwrite the sentinel if it ran again
    h.ge.engine_mut().state.morph_weights[0] = -7.0;
    h.ge.run(&mut h.mem, 2);

    assert_eq!(h.ge.engine().state().morph_weights[0], -7.0);
    assert_eq!(h.ge.stats().commands, 3);
}

#[test]
fn test_execute_on_change_skips_zero_diff_fast_path() {
    check_execute_on_change_skips_repeats(false);
}

#[test]
fn test_execute_on_change_skips_zero_diff_slow_path() {
    check_execute_on_change_skips_repeats(true);
}

#[test]
fn test_state_change_marks_dirty_without_flushing_backend_state() {
    let mut h = Harness::with_config(no_end_flush());
    h.load(LIST, &[cmd(opcodes::ZTEST, 1)]);
    h.ge.enqueue(&h.mem, LIST, LIST + 4, false).unwrap();
    h.ge.engine_mut().flush();

    h.ge.run(&mut h.mem, 1);

    assert!(h.ge.engine().pending_dirty().contains(DirtyFlags::DEPTHSTENCIL_STATE));
}

#[test]
fn test_unknown_opcode_is_counted_and_skipped() {
    let mut words = vec![cmd(0x03, 0x12_3456), cmd(0xFE, 0)];
    words.extend(finish());

    let mut h = Harness::new();
    let id = h.run_list(&words);

    assert_eq!(h.state(id), ListState::Completed(None));
    assert_eq!(h.ge.stats().unknown_commands, 2);
}

#[test]
fn test_tracer_records_each_command() {
    let mut h = Harness::new();
    let (tracer, buffer) = CommandTracer::in_memory();
    h.ge.engine_mut().set_tracer(Some(tracer));

    let mut words = vec![cmd(opcodes::ZTEST, 1), cmd(opcodes::NOP, 0)];
    words.extend(finish());
    h.run_list(&words);

    let lines = buffer.lines();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("ZTEST"));
    assert!(lines[3].contains("END"));
}

#[test]
fn test_budget_limits_commands() {
    let mut h = Harness::new();
    h.load(LIST, &[cmd(opcodes::NOP, 0); 16]);
    let id = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();

    assert_eq!(h.ge.run(&mut h.mem, 5), 5);
    assert_eq!(h.ge.list(id).unwrap().pc, LIST + 20);
    assert_eq!(h.state(id), ListState::Running);
}

#[test]
fn test_fetch_from_unmapped_pc_faults_list() {
    let mut h = Harness::new();
    // Last word of RAM, then the PC runs off the end
    let last = GuestMemory::RAM_START + h.mem.ram_size() - 4;
    h.load(last, &[cmd(opcodes::NOP, 0)]);
    let id = h.ge.enqueue(&h.mem, last, 0, false).unwrap();

    h.ge.run(&mut h.mem, 10);

    assert_eq!(
        h.state(id),
        ListState::Completed(Some(ListFault::InvalidProgramCounter {
            pc: last + 4
        }))
    );
}

/// Commands whose effects are observable without drawing
fn command_strategy() -> impl Strategy<Value = u32> {
    let opcode = prop::sample::select(vec![
        opcodes::NOP,
        opcodes::BASE,
        opcodes::VADDR,
        opcodes::IADDR,
        opcodes::OFFSETADDR,
        opcodes::VERTEXTYPE,
        opcodes::FOGCOLOR,
        opcodes::ZTEST,
        opcodes::CLEARMODE,
        opcodes::MORPHWEIGHT0,
        opcodes::MORPHWEIGHT3,
        opcodes::TEXSCALEU,
        opcodes::TEXOFFSETV,
        opcodes::TEXSIZE0,
        opcodes::TEXLEVEL,
        opcodes::WORLDMATRIXNUMBER,
        opcodes::WORLDMATRIXDATA,
        opcodes::BONEMATRIXNUMBER,
        opcodes::BONEMATRIXDATA,
        opcodes::PROJMATRIXDATA,
        opcodes::TEXSYNC,
    ]);
    // Small payloads so repeats (zero diffs) are common
    (opcode, 0u32..4, any::<u32>()).prop_map(|(opcode, choice, payload)| {
        let payload = match choice {
            0 => 0,
            1 => 1,
            2 => 0x3F_8000,
            _ => payload & 0x00FF_FFFF,
        };
        cmd(opcode, payload)
    })
}

fn run_program(words: &[u32], stepping: bool) -> Harness {
    let mut h = Harness::new();
    h.ge.engine_mut().set_stepping(stepping);
    let mut program = words.to_vec();
    program.extend(finish());
    h.run_list(&program);
    h
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_fast_and_slow_paths_agree(words in prop::collection::vec(command_strategy(), 1..64)) {
        let fast = run_program(&words, false);
        let slow = run_program(&words, true);

        let (f, s) = (fast.ge.engine(), slow.ge.engine());
        prop_assert_eq!(f.registers().raw_slots(), s.registers().raw_slots());
        prop_assert_eq!(&f.registers().matrices, &s.registers().matrices);
        prop_assert_eq!(f.state().vertex_addr, s.state().vertex_addr);
        prop_assert_eq!(f.state().index_addr, s.state().index_addr);
        prop_assert_eq!(f.state().offset_addr, s.state().offset_addr);
        prop_assert_eq!(
            f.state().morph_weights.map(f32::to_bits),
            s.state().morph_weights.map(f32::to_bits)
        );
        prop_assert_eq!(f.pending_dirty(), s.pending_dirty());
        prop_assert_eq!(f.backend().events(), s.backend().events());
        prop_assert_eq!(f.stats(), s.stats());
    }

    #[test]
    fn prop_second_identical_write_has_zero_diff(opcode in any::<u8>(), payload in 0u32..0x0100_0000) {
        let mut regs = RegisterFile::new();
        let word = cmd(opcode, payload);

        regs.set_register(opcode, word);
        prop_assert_eq!(regs.set_register(opcode, word), 0);
    }
}
