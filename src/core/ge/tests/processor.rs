// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Display list queue tests

use super::*;
use crate::core::error::{EmulatorError, GeError};

const OTHER: u32 = LIST + 0x100;

fn ge_error(result: crate::core::error::Result<impl std::fmt::Debug>) -> GeError {
    match result {
        Err(EmulatorError::Ge(err)) => err,
        other => panic!("expected a GE error, got {:?}", other),
    }
}

/// SIGNAL(suspend) + END, then FINISH + END
fn suspending_list() -> Vec<u32> {
    let mut words = vec![cmd(opcodes::SIGNAL, 0x01_0000), cmd(opcodes::END, 0)];
    words.extend(finish());
    words
}

#[test]
fn test_enqueue_rejects_bad_addresses() {
    let mut h = Harness::new();

    assert_eq!(
        ge_error(h.ge.enqueue(&h.mem, LIST + 2, 0, false)),
        GeError::InvalidListAddress {
            address: LIST + 2,
            stall: 0
        }
    );
    assert_eq!(
        ge_error(h.ge.enqueue(&h.mem, 0x1000, 0, false)),
        GeError::InvalidListAddress {
            address: 0x1000,
            stall: 0
        }
    );
    assert_eq!(
        ge_error(h.ge.enqueue(&h.mem, LIST, LIST + 1, false)),
        GeError::InvalidListAddress {
            address: LIST,
            stall: LIST + 1
        }
    );
    assert_eq!(h.ge.queue().count(), 0);
}

#[test]
fn test_enqueue_rejects_address_in_use() {
    let mut h = Harness::new();
    h.load(LIST, &finish());

    let id = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();

    // Same list through the uncached mirror
    assert_eq!(
        ge_error(h.ge.enqueue(&h.mem, LIST | 0x4000_0000, 0, false)),
        GeError::ListAddressInUse {
            address: LIST | 0x4000_0000,
            id
        }
    );
}

#[test]
fn test_enqueue_fails_when_slots_are_full() {
    let mut h = Harness::with_config(GeConfig {
        max_display_lists: 2,
        ..GeConfig::default()
    });

    h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();
    h.ge.enqueue(&h.mem, OTHER, 0, false).unwrap();

    assert_eq!(
        ge_error(h.ge.enqueue(&h.mem, LIST + 0x200, 0, false)),
        GeError::NoFreeListSlot
    );
}

#[test]
fn test_completed_slots_are_reused_round_robin() {
    let mut h = Harness::with_config(GeConfig {
        max_display_lists: 2,
        ..GeConfig::default()
    });
    h.load(LIST, &finish());
    h.load(OTHER, &finish());

    let first = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();
    h.ge.run(&mut h.mem, 100);
    let second = h.ge.enqueue(&h.mem, OTHER, 0, false).unwrap();
    h.ge.run(&mut h.mem, 100);
    let third = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();

    assert_eq!((first, second, third), (0, 1, 0));
    assert_eq!(h.state(0), ListState::Queued);
    // The previous occupant's outcome stays readable until the slot is reused
    assert_eq!(h.state(1), ListState::Completed(None));
}

#[test]
fn test_lists_run_in_queue_order() {
    let mut h = Harness::new();
    h.load(LIST, &finish());
    h.load(OTHER, &[cmd(opcodes::FINISH, 1), cmd(opcodes::END, 0)]);

    let a = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();
    let b = h.ge.enqueue(&h.mem, OTHER, 0, false).unwrap();

    assert_eq!(h.ge.run(&mut h.mem, 100), 4);
    assert_eq!(
        h.listener.events(),
        vec![
            ListenerEvent::Finish { list: a, token: 0 },
            ListenerEvent::ListComplete(a),
            ListenerEvent::Finish { list: b, token: 1 },
            ListenerEvent::ListComplete(b),
            ListenerEvent::DrawComplete,
        ]
    );
    assert_eq!(h.ge.stats().lists_completed, 2);
}

#[test]
fn test_budget_spans_lists() {
    let mut h = Harness::new();
    h.load(LIST, &finish());
    h.load(OTHER, &finish());
    let a = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();
    let b = h.ge.enqueue(&h.mem, OTHER, 0, false).unwrap();

    assert_eq!(h.ge.run(&mut h.mem, 3), 3);

    assert_eq!(h.state(a), ListState::Completed(None));
    assert_eq!(h.state(b), ListState::Running);
    assert_eq!(h.ge.current_list().map(|l| l.id), Some(b));
}

#[test]
fn test_faulted_list_does_not_stop_the_queue() {
    let mut h = Harness::new();
    h.load(LIST, &[cmd(opcodes::RET, 0)]);
    h.load(OTHER, &finish());

    let a = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();
    let b = h.ge.enqueue(&h.mem, OTHER, 0, false).unwrap();
    h.ge.run(&mut h.mem, 100);

    assert_eq!(
        h.listener.events(),
        vec![
            ListenerEvent::ListFault {
                list: a,
                fault: ListFault::StackUnderflow { pc: LIST }
            },
            ListenerEvent::ListComplete(a),
            ListenerEvent::Finish { list: b, token: 0 },
            ListenerEvent::ListComplete(b),
            ListenerEvent::DrawComplete,
        ]
    );
}

#[test]
fn test_stalled_head_blocks_the_queue() {
    let mut h = Harness::new();
    h.load(LIST, &finish());
    h.load(OTHER, &finish());

    let a = h.ge.enqueue(&h.mem, LIST, LIST, false).unwrap();
    let b = h.ge.enqueue(&h.mem, OTHER, 0, false).unwrap();

    assert_eq!(h.ge.run(&mut h.mem, 100), 0);
    assert_eq!(h.ge.list_sync(a).unwrap(), ListStatus::Stalling);
    assert_eq!(h.ge.list_sync(b).unwrap(), ListStatus::Queued);
    assert_eq!(h.ge.draw_sync(), DrawStatus::Stalling);

    h.ge.update_stall(a, 0).unwrap();
    h.ge.run(&mut h.mem, 100);
    assert_eq!(h.ge.list_sync(b).unwrap(), ListStatus::Completed);
}

#[test]
fn test_head_insert_requires_paused_current_list() {
    let mut h = Harness::new();
    h.load(LIST, &finish());
    h.load(OTHER, &finish());
    let a = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();

    assert_eq!(
        ge_error(h.ge.enqueue(&h.mem, OTHER, 0, true)),
        GeError::HeadInsertRejected { id: a }
    );
}

#[test]
fn test_head_insert_runs_before_paused_list() {
    let mut h = Harness::new();
    h.load(LIST, &suspending_list());
    h.load(OTHER, &finish());

    let a = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();
    h.ge.run(&mut h.mem, 100);
    assert_eq!(h.state(a), ListState::Paused(PauseReason::Signal));

    let b = h.ge.enqueue(&h.mem, OTHER, 0, true).unwrap();
    assert_eq!(h.state(b), ListState::Paused(PauseReason::Inserted));
    assert_eq!(h.state(a), ListState::Queued);
    assert_eq!(h.ge.queue().collect::<Vec<_>>(), vec![b, a]);

    // Nothing runs until the inserted list is continued
    assert_eq!(h.ge.run(&mut h.mem, 100), 0);

    h.ge.continue_list().unwrap();
    h.ge.run(&mut h.mem, 100);

    assert_eq!(h.state(b), ListState::Completed(None));
    assert_eq!(h.state(a), ListState::Completed(None));
    let finishes: Vec<ListId> = h
        .listener
        .events()
        .iter()
        .filter_map(|e| match e {
            ListenerEvent::Finish { list, .. } => Some(*list),
            _ => None,
        })
        .collect();
    assert_eq!(finishes, vec![b, a]);
}

#[test]
fn test_dequeue() {
    let mut h = Harness::new();
    h.load(LIST, &finish());
    h.load(OTHER, &finish());

    let a = h.ge.enqueue(&h.mem, LIST, LIST, false).unwrap();
    let b = h.ge.enqueue(&h.mem, OTHER, 0, false).unwrap();
    h.ge.run(&mut h.mem, 100);

    // `a` has started (and stalled)
    assert_eq!(ge_error(h.ge.dequeue(a)), GeError::ListBusy { id: a });

    h.ge.dequeue(b).unwrap();
    assert_eq!(h.state(b), ListState::None);
    assert_eq!(h.ge.queue().collect::<Vec<_>>(), vec![a]);
    assert!(h.listener.events().contains(&ListenerEvent::ListComplete(b)));

    assert_eq!(ge_error(h.ge.dequeue(b)), GeError::InvalidListId { id: b });
    assert_eq!(ge_error(h.ge.dequeue(1000)), GeError::InvalidListId { id: 1000 });
}

#[test]
fn test_update_stall_errors() {
    let mut h = Harness::new();
    let id = h.run_list(&finish());

    assert_eq!(
        ge_error(h.ge.update_stall(id, LIST + 8)),
        GeError::ListAlreadyCompleted { id }
    );
    assert_eq!(ge_error(h.ge.update_stall(7, 0)), GeError::InvalidListId { id: 7 });
}

#[test]
fn test_continue_errors() {
    let mut h = Harness::new();
    assert_eq!(ge_error(h.ge.continue_list()), GeError::NoCurrentList);

    h.load(LIST, &finish());
    let id = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();
    assert_eq!(ge_error(h.ge.continue_list()), GeError::NotPaused { id });
}

#[test]
fn test_break_current_completes_head_only() {
    let mut h = Harness::new();
    h.load(LIST, &suspending_list());
    h.load(OTHER, &finish());
    let a = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();
    let b = h.ge.enqueue(&h.mem, OTHER, 0, false).unwrap();
    h.ge.run(&mut h.mem, 100);

    h.ge.break_lists(BreakMode::Current).unwrap();
    assert_eq!(h.state(a), ListState::Completed(Some(ListFault::Break)));
    assert_eq!(h.state(b), ListState::Queued);

    h.ge.run(&mut h.mem, 100);
    assert_eq!(h.state(b), ListState::Completed(None));
}

#[test]
fn test_break_all_empties_the_queue() {
    let mut h = Harness::new();
    h.load(LIST, &finish());
    h.load(OTHER, &finish());
    let a = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();
    let b = h.ge.enqueue(&h.mem, OTHER, 0, false).unwrap();

    h.ge.break_lists(BreakMode::All).unwrap();

    assert_eq!(h.state(a), ListState::Completed(Some(ListFault::Break)));
    assert_eq!(h.state(b), ListState::Completed(Some(ListFault::Break)));
    assert_eq!(h.ge.queue().count(), 0);
    assert_eq!(h.ge.draw_sync(), DrawStatus::Completed);
    assert_eq!(h.listener.events().last(), Some(&ListenerEvent::DrawComplete));

    assert_eq!(ge_error(h.ge.break_lists(BreakMode::Current)), GeError::NoCurrentList);
    assert!(h.ge.break_lists(BreakMode::All).is_ok());
}

#[test]
fn test_break_handle_applies_at_next_run() {
    let mut h = Harness::new();
    h.load(LIST, &finish());
    h.load(OTHER, &finish());
    let a = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();
    let b = h.ge.enqueue(&h.mem, OTHER, 0, false).unwrap();

    let handle = h.ge.break_handle();
    handle.request(BreakMode::Current);
    assert!(handle.is_pending());

    assert_eq!(h.ge.run(&mut h.mem, 100), 2);

    assert!(!handle.is_pending());
    assert_eq!(h.state(a), ListState::Completed(Some(ListFault::Break)));
    assert_eq!(h.state(b), ListState::Completed(None));
}

#[test]
fn test_break_handle_with_empty_queue_is_consumed() {
    let mut h = Harness::new();
    let handle = h.ge.break_handle();
    handle.request(BreakMode::Current);

    assert_eq!(h.ge.run(&mut h.mem, 100), 0);
    assert!(!handle.is_pending());

    // A later list is unaffected by the stale request
    h.load(LIST, &finish());
    let id = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();
    assert_eq!(h.ge.run(&mut h.mem, 100), 2);
    assert_eq!(h.state(id), ListState::Completed(None));
}

#[test]
fn test_break_all_is_not_downgraded() {
    let mut h = Harness::new();
    h.load(LIST, &finish());
    h.load(OTHER, &finish());
    h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();
    h.ge.enqueue(&h.mem, OTHER, 0, false).unwrap();

    let handle = h.ge.break_handle();
    handle.request(BreakMode::All);
    handle.request(BreakMode::Current);

    assert_eq!(h.ge.run(&mut h.mem, 100), 0);
    assert_eq!(h.ge.stats().lists_completed, 0);
}

#[test]
fn test_step_executes_one_command() {
    let mut h = Harness::new();
    let mut words = vec![cmd(opcodes::NOP, 0), cmd(opcodes::NOP, 0)];
    words.extend(finish());
    h.load(LIST, &words);
    let id = h.ge.enqueue(&h.mem, LIST, 0, false).unwrap();

    assert_eq!(h.ge.step(&mut h.mem), 1);
    assert_eq!(h.ge.list(id).unwrap().pc, LIST + 4);
    assert_eq!(h.ge.list_sync(id).unwrap(), ListStatus::Drawing);
    assert_eq!(h.ge.draw_sync(), DrawStatus::Drawing);
}

#[test]
fn test_sync_queries() {
    let mut h = Harness::new();
    assert_eq!(h.ge.draw_sync(), DrawStatus::Completed);
    assert_eq!(ge_error(h.ge.list_sync(0)), GeError::InvalidListId { id: 0 });
    assert_eq!(ge_error(h.ge.list_sync(999)), GeError::InvalidListId { id: 999 });

    let id = h.run_list(&finish());
    assert_eq!(h.ge.list_sync(id).unwrap(), ListStatus::Completed);
}

#[test]
fn test_interrupt_end() {
    let mut h = Harness::new();
    let id = h.run_list(&finish());
    let before = h.listener.events().len();

    h.ge.interrupt_end(id).unwrap();

    // Already removed from the queue when it finished
    assert_eq!(h.listener.events().len(), before);
    assert_eq!(ge_error(h.ge.interrupt_end(4096)), GeError::InvalidListId { id: 4096 });
}

#[test]
fn test_reset_drops_lists() {
    let mut h = Harness::new();
    h.load(LIST, &finish());
    h.ge.enqueue(&h.mem, LIST, LIST, false).unwrap();
    h.ge.run(&mut h.mem, 10);

    h.ge.reset();

    assert_eq!(h.ge.queue().count(), 0);
    assert!(h.ge.lists().iter().all(|l| l.state == ListState::None));
    assert_eq!(h.ge.stats(), GeStats::default());
}

#[test]
fn test_snapshot_serializes_lists_and_registers() {
    let mut h = Harness::new();
    let done = h.run_list(&[cmd(opcodes::VERTEXTYPE, 0x11F), cmd(opcodes::FINISH, 0), cmd(opcodes::END, 0)]);
    h.load(OTHER, &finish());
    let stalled = h.ge.enqueue(&h.mem, OTHER, OTHER, false).unwrap();

    let snapshot = h.ge.snapshot();
    assert_eq!(
        snapshot.registers[opcodes::VERTEXTYPE as usize],
        cmd(opcodes::VERTEXTYPE, 0x11F)
    );
    assert_eq!(snapshot.queue, vec![stalled]);
    assert_eq!(snapshot.lists.len(), 2);

    let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
    assert_eq!(json["lists"][0]["id"], serde_json::json!(done));
    assert_eq!(json["queue"][0], serde_json::json!(stalled));
    assert_eq!(json["stats"]["lists_completed"], serde_json::json!(1));
}
