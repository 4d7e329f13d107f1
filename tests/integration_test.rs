// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end tests through the public API

mod common;

use common::assertions::{assert_list_state, assert_memory_word, assert_payload};
use common::fixtures::{
    create_processor, create_processor_with, load_triangle, run_list_at, LIST, VERTICES,
};
use common::test_lists::{cmd, finish, state_list, triangle_list};
use gerx::core::config::GeConfig;
use gerx::core::error::ListFault;
use gerx::core::ge::{
    opcodes, GeWorker, ListState, ListenerEvent, PrimitiveType, RecordingBackend,
};
use gerx::core::save_state::SaveState;

#[test]
fn test_triangle_end_to_end() {
    let (mut ge, listener, mut mem) = create_processor();
    load_triangle(&mut mem, VERTICES);

    let id = run_list_at(&mut ge, &mut mem, LIST, &triangle_list(VERTICES));

    assert_list_state(&ge, id, ListState::Completed(None));
    assert_eq!(
        ge.engine().backend().primitive_batches(),
        vec![(PrimitiveType::Triangles, 3)]
    );
    assert_eq!(ge.engine().state().vertex_addr, VERTICES + 36);
    assert_eq!(
        listener.events(),
        vec![
            ListenerEvent::Finish { list: id, token: 0 },
            ListenerEvent::ListComplete(id),
            ListenerEvent::DrawComplete,
        ]
    );
}

#[test]
fn test_queued_lists_run_in_order() {
    let (mut ge, listener, mut mem) = create_processor();
    let second = LIST + 0x1000;
    mem.write_words(LIST, &finish(1)).unwrap();
    mem.write_words(second, &finish(2)).unwrap();

    let a = ge.enqueue(&mem, LIST, 0, false).unwrap();
    let b = ge.enqueue(&mem, second, 0, false).unwrap();
    ge.run(&mut mem, 1000);

    let finishes: Vec<_> = listener
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ListenerEvent::Finish { list, token } => Some((list, token)),
            _ => None,
        })
        .collect();
    assert_eq!(finishes, vec![(a, 1), (b, 2)]);
    assert_eq!(ge.stats().lists_completed, 2);
}

#[test]
fn test_state_list_sets_registers() {
    let (mut ge, _, mut mem) = create_processor();

    run_list_at(&mut ge, &mut mem, LIST, &state_list());

    assert_payload(&ge, opcodes::FOGCOLOR, 0x00_80FF);
    assert_payload(&ge, opcodes::ZTESTENABLE, 1);
    assert_payload(&ge, opcodes::TEXFUNC, 0x00_0103);
}

#[test]
fn test_save_state_resumes_on_fresh_processor() {
    let mut words = vec![
        cmd(opcodes::FOGCOLOR, 0x12_3456),
        cmd(opcodes::ZTESTENABLE, 1),
    ];
    words.extend(triangle_list(VERTICES));

    // Uninterrupted reference run
    let (mut reference, _, mut reference_mem) = create_processor();
    load_triangle(&mut reference_mem, VERTICES);
    run_list_at(&mut reference, &mut reference_mem, LIST, &words);

    // Stop after two commands and save
    let (mut ge, _, mut mem) = create_processor();
    load_triangle(&mut mem, VERTICES);
    mem.write_words(LIST, &words).unwrap();
    let id = ge.enqueue(&mem, LIST, LIST + 8, false).unwrap();
    assert_eq!(ge.run(&mut mem, 1000), 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("resume.state");
    SaveState::from_processor(&ge, Some(&mem))
        .save_to_file(&path)
        .unwrap();

    let (mut restored, _, mut restored_mem) = create_processor();
    SaveState::load_from_file(&path)
        .unwrap()
        .apply_to(&mut restored, Some(&mut restored_mem))
        .unwrap();
    restored.update_stall(id, 0).unwrap();
    restored.run(&mut restored_mem, 1000);

    assert_list_state(&restored, id, ListState::Completed(None));
    assert_eq!(
        restored.engine().registers().raw_slots(),
        reference.engine().registers().raw_slots()
    );
    assert_eq!(
        restored.engine().state().vertex_addr,
        reference.engine().state().vertex_addr
    );
    assert_eq!(
        restored.engine().backend().primitive_batches(),
        vec![(PrimitiveType::Triangles, 3)]
    );
}

#[test]
fn test_threaded_worker_matches_direct_run() {
    let mut words = state_list();
    words.truncate(words.len() - 2);
    words.extend(triangle_list(VERTICES));

    let (mut direct, _, mut direct_mem) = create_processor();
    load_triangle(&mut direct_mem, VERTICES);
    run_list_at(&mut direct, &mut direct_mem, LIST, &words);

    let (ge, _, mut mem) = create_processor();
    load_triangle(&mut mem, VERTICES);
    let mut worker: GeWorker<RecordingBackend> = GeWorker::spawn(ge, mem).unwrap();
    worker.write_words(LIST, &words).unwrap();
    let id = worker.enqueue(LIST, 0, false).unwrap();
    worker.run(1_000_000).unwrap();
    let stats = worker.stats().unwrap();
    let (threaded, _) = worker.shutdown().unwrap();

    assert_eq!(stats, direct.stats());
    assert_list_state(&threaded, id, ListState::Completed(None));
    assert_eq!(
        threaded.engine().registers().raw_slots(),
        direct.engine().registers().raw_slots()
    );
    assert_eq!(
        threaded.engine().backend().events(),
        direct.engine().backend().events()
    );
}

#[test]
fn test_config_limits_call_depth() {
    let config = GeConfig::from_toml_str("call_stack_depth = 1\n").unwrap();
    let (mut ge, _, mut mem) = create_processor_with(config);

    let sub1 = LIST + 0x100;
    let sub2 = LIST + 0x200;
    mem.write_words(sub1, &[cmd(opcodes::CALL, sub2 & 0xFF_FFFF), cmd(opcodes::RET, 0)])
        .unwrap();
    mem.write_words(sub2, &[cmd(opcodes::RET, 0)]).unwrap();

    let mut words = vec![
        cmd(opcodes::BASE, 0x08_0000),
        cmd(opcodes::CALL, sub1 & 0xFF_FFFF),
    ];
    words.extend(finish(0));
    let id = run_list_at(&mut ge, &mut mem, LIST, &words);

    assert_list_state(
        &ge,
        id,
        ListState::Completed(Some(ListFault::StackOverflow { pc: sub1 })),
    );
    assert_eq!(ge.stats().list_faults, 1);
}

#[test]
fn test_snapshot_serializes_to_json() {
    let (mut ge, _, mut mem) = create_processor();
    run_list_at(&mut ge, &mut mem, LIST, &state_list());

    let json = ge.snapshot().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["registers"].as_array().map(|r| r.len()), Some(256));
    assert_eq!(value["stats"]["lists_completed"], 1);
    assert_eq!(
        value["registers"][opcodes::FOGCOLOR as usize],
        cmd(opcodes::FOGCOLOR, 0x00_80FF)
    );
}

#[test]
fn test_memory_copy_through_processor() {
    let (mut ge, _, mut mem) = create_processor();
    let src = 0x0890_0000;
    let dst = 0x0400_0000;
    mem.write_words(src, &[0xDEAD_BEEF, 0x0123_4567]).unwrap();

    ge.perform_memory_copy(&mut mem, dst, src, 8).unwrap();

    assert_memory_word(&mem, dst, 0xDEAD_BEEF);
    assert_memory_word(&mem, dst + 4, 0x0123_4567);
    assert_eq!(ge.engine().caches().stats().hint, 1);
}
