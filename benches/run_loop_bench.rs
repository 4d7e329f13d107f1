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

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gerx::core::config::GeConfig;
use gerx::core::ge::{
    opcodes, CommandTracer, CommandWord, DispatchTable, GeProcessor, NullBackend, NullListener,
};
use gerx::core::memory::GuestMemory;
use std::hint::black_box;

const LIST: u32 = 0x0880_0000;

fn cmd(opcode: u8, payload: u32) -> u32 {
    CommandWord::new(opcode, payload).0
}

/// State-only list: alternating fog color writes, half of them redundant
fn state_list(count: u32) -> Vec<u32> {
    let mut words: Vec<u32> = (0..count)
        .map(|i| cmd(opcodes::FOGCOLOR, (i / 2) & 0xFF))
        .collect();
    words.push(cmd(opcodes::FINISH, 0));
    words.push(cmd(opcodes::END, 0));
    words
}

/// Full world/view/projection uploads
fn matrix_list(uploads: u32) -> Vec<u32> {
    let mut words = Vec::new();
    for i in 0..uploads {
        for (num, data, len) in [
            (opcodes::WORLDMATRIXNUMBER, opcodes::WORLDMATRIXDATA, 12),
            (opcodes::VIEWMATRIXNUMBER, opcodes::VIEWMATRIXDATA, 12),
            (opcodes::PROJMATRIXNUMBER, opcodes::PROJMATRIXDATA, 16),
        ] {
            words.push(cmd(num, 0));
            words.extend((0..len).map(|e| cmd(data, 0x3F_8000 + i + e)));
        }
    }
    words.push(cmd(opcodes::FINISH, 0));
    words.push(cmd(opcodes::END, 0));
    words
}

fn processor(config: GeConfig) -> GeProcessor<NullBackend> {
    GeProcessor::new(config, NullBackend::new(), Box::new(NullListener)).unwrap()
}

fn run_once(ge: &mut GeProcessor<NullBackend>, mem: &mut GuestMemory) -> u32 {
    ge.enqueue(mem, LIST, 0, false).unwrap();
    ge.run(mem, u32::MAX)
}

fn run_loop_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_loop");

    for count in [256u32, 4096] {
        let words = state_list(count);

        group.bench_with_input(BenchmarkId::new("fast_path", count), &words, |b, words| {
            let mut mem = GuestMemory::new();
            mem.write_words(LIST, words).unwrap();
            let mut ge = processor(GeConfig::default());

            b.iter(|| black_box(run_once(&mut ge, &mut mem)));
        });

        group.bench_with_input(BenchmarkId::new("slow_path", count), &words, |b, words| {
            let mut mem = GuestMemory::new();
            mem.write_words(LIST, words).unwrap();
            let mut ge = processor(GeConfig::default());
            ge.engine_mut().set_stepping(true);

            b.iter(|| black_box(run_once(&mut ge, &mut mem)));
        });

        group.bench_with_input(BenchmarkId::new("traced", count), &words, |b, words| {
            let mut mem = GuestMemory::new();
            mem.write_words(LIST, words).unwrap();
            let mut ge = processor(GeConfig::default());
            ge.engine_mut()
                .set_tracer(Some(CommandTracer::new(Box::new(std::io::sink()))));

            b.iter(|| black_box(run_once(&mut ge, &mut mem)));
        });
    }

    group.finish();
}

fn matrix_load_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix_load");
    let words = matrix_list(64);

    for fast in [true, false] {
        let name = if fast { "bulk" } else { "per_word" };
        group.bench_function(name, |b| {
            let mut mem = GuestMemory::new();
            mem.write_words(LIST, &words).unwrap();
            let mut config = GeConfig::default();
            config.fast_matrix_load = fast;
            let mut ge = processor(config);

            b.iter(|| black_box(run_once(&mut ge, &mut mem)));
        });
    }

    group.finish();
}

fn dispatch_table_benchmark(c: &mut Criterion) {
    let config = GeConfig::default().dispatch();

    c.bench_function("dispatch_table_build", |b| {
        b.iter(|| black_box(DispatchTable::build(black_box(config), &[]).unwrap()));
    });
}

criterion_group!(
    benches,
    run_loop_benchmark,
    matrix_load_benchmark,
    dispatch_table_benchmark
);
criterion_main!(benches);
