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

//! Command-line GE runner
//!
//! Loads a memory image or a text word list into guest memory, enqueues a
//! display list and runs it against a null or recording backend.

use clap::{Parser, ValueEnum};
use gerx::core::config::GeConfig;
use gerx::core::error::{EmulatorError, Result};
use gerx::core::ge::{
    CommandTracer, GeProcessor, GeWorker, NullBackend, NullListener, RecordingBackend,
    RenderBackend,
};
use gerx::core::memory::GuestMemory;
use gerx::core::save_state::SaveState;
use log::{error, info};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    /// Discard all work
    Null,
    /// Record every backend call and print a summary
    Recording,
}

/// PSP GE command processor
#[derive(Parser)]
#[command(name = "gerx")]
#[command(about = "Run PSP GE display lists", long_about = None)]
struct Args {
    /// Memory image (binary) or word list (with --words) to load
    input: Option<String>,

    /// Treat the input as whitespace-separated hex words
    #[arg(short = 'w', long)]
    words: bool,

    /// Address the input is loaded at
    #[arg(short = 'a', long, default_value = "0x08800000", value_parser = parse_address)]
    load_address: u32,

    /// Address of the first command (defaults to the load address)
    #[arg(short = 'l', long, value_parser = parse_address)]
    list: Option<u32>,

    /// Stall address, 0 for none
    #[arg(short = 's', long, default_value = "0", value_parser = parse_address)]
    stall: u32,

    /// Maximum number of commands to execute
    #[arg(short = 'n', long, default_value = "1000000")]
    budget: u32,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<String>,

    #[arg(short = 'b', long, value_enum, default_value = "null")]
    backend: Backend,

    /// Write one trace line per executed command to this file
    #[arg(long)]
    trace: Option<String>,

    /// Write a JSON snapshot after the run
    #[arg(long)]
    snapshot: Option<String>,

    /// Restore a save state before running
    #[arg(long)]
    load_state: Option<String>,

    /// Save state after the run
    #[arg(long)]
    save_state: Option<String>,

    /// Run the processor on a worker thread
    #[arg(short = 't', long)]
    threaded: bool,
}

fn parse_address(text: &str) -> std::result::Result<u32, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid address {:?}: {}", text, e))
}

/// Parse a word list: hex words separated by whitespace, `#` starts a comment
fn parse_words(text: &str) -> Result<Vec<u32>> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace)
        .map(|word| parse_address(word).map_err(EmulatorError::Parse))
        .collect()
}

fn load_input(args: &Args, mem: &mut GuestMemory) -> Result<()> {
    let Some(path) = &args.input else {
        return Ok(());
    };

    if args.words {
        let text = std::fs::read_to_string(path)?;
        let words = parse_words(&text)?;
        mem.write_words(args.load_address, &words)?;
        info!(
            "Loaded {} words from {} at 0x{:08X}",
            words.len(),
            path,
            args.load_address
        );
    } else {
        mem.load_file(args.load_address, path)?;
    }
    Ok(())
}

fn run<B: RenderBackend + Send + 'static>(args: &Args, config: GeConfig, backend: B) -> Result<GeProcessor<B>> {
    let mut mem = GuestMemory::with_ram_size(config.ram_size);
    let threaded = config.threaded;
    let mut ge = GeProcessor::new(config, backend, Box::new(NullListener))?;

    if let Some(path) = &args.load_state {
        info!("Restoring state from {}", path);
        SaveState::load_from_file(path)?.apply_to(&mut ge, Some(&mut mem))?;
    }

    load_input(args, &mut mem)?;

    if let Some(path) = &args.trace {
        ge.engine_mut().set_tracer(Some(CommandTracer::to_file(path)?));
    }

    let pc = args.list.unwrap_or(args.load_address);
    let enqueue = args.input.is_some();

    let (mut ge, mem, executed) = if threaded {
        let mut worker = GeWorker::spawn(ge, mem)?;
        if enqueue {
            worker.enqueue(pc, args.stall, false)?;
        }
        let executed = worker.run(args.budget)?;
        let (ge, mem) = worker.shutdown()?;
        (ge, mem, executed)
    } else {
        if enqueue {
            ge.enqueue(&mem, pc, args.stall, false)?;
        }
        let executed = ge.run(&mut mem, args.budget);
        (ge, mem, executed)
    };

    info!("Executed {} commands", executed);

    if let Some(tracer) = ge.engine_mut().tracer_mut() {
        tracer.flush()?;
    }
    if let Some(path) = &args.snapshot {
        ge.snapshot().write_json(path)?;
        info!("Snapshot written to {}", path);
    }
    if let Some(path) = &args.save_state {
        SaveState::from_processor(&ge, Some(&mem)).save_to_file(path)?;
    }

    Ok(ge)
}

fn print_stats<B: RenderBackend>(ge: &GeProcessor<B>) {
    let stats = ge.stats();
    let caches = ge.engine().caches().stats();

    println!("commands:        {}", stats.commands);
    println!("cycles:          {}", stats.cycles);
    println!("flushes:         {}", stats.flushes);
    println!("draws:           {} ({} vertices)", stats.draws, stats.vertices);
    println!("patches:         {}", stats.patches);
    println!(
        "block transfers: {} ({} bytes)",
        stats.block_transfers, stats.block_transfer_bytes
    );
    println!(
        "lists completed: {} ({} faulted)",
        stats.lists_completed, stats.list_faults
    );
    println!("unknown:         {}", stats.unknown_commands);
    println!(
        "invalidations:   hint {} / safe {} / all {}",
        caches.hint, caches.safe, caches.all
    );

    for list in ge.lists().iter().filter(|l| l.started) {
        println!(
            "list {:2}: {:?} at 0x{:08X}",
            list.id, list.state, list.pc
        );
    }
}

fn main() -> Result<()> {
    // Load .env file if present; a missing file is not an error
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("gerx v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    if args.input.is_none() && args.load_state.is_none() {
        error!("Nothing to run: give an input file or --load-state");
        return Err(EmulatorError::Parse("no input".to_string()));
    }

    let mut config = match &args.config {
        Some(path) => GeConfig::load(path)?,
        None => GeConfig::default(),
    };
    config.apply_env();
    if args.threaded {
        config.threaded = true;
    }

    match args.backend {
        Backend::Null => {
            let ge = run(&args, config, NullBackend::new())?;
            print_stats(&ge);
        }
        Backend::Recording => {
            let ge = run(&args, config, RecordingBackend::new())?;
            print_stats(&ge);

            let backend = ge.engine().backend();
            println!("backend events:  {}", backend.events().len());
            for (primitive, count) in backend.primitive_batches() {
                println!("  {:?} x{}", primitive, count);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x08800000"), Ok(0x0880_0000));
        assert_eq!(parse_address("ff"), Ok(0xFF));
        assert!(parse_address("zz").is_err());
    }

    #[test]
    fn test_parse_words_skips_comments() {
        let words = parse_words("0x10080000 # BASE\n\n0F000000 0C000000\n").unwrap();
        assert_eq!(words, vec![0x1008_0000, 0x0F00_0000, 0x0C00_0000]);
    }
}
