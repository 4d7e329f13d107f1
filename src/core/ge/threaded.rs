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

//! Worker thread mode
//!
//! [`GeWorker`] moves a [`GeProcessor`] and the guest memory it runs
//! against onto a dedicated thread. The owner talks to it through a bounded
//! single-producer/single-consumer event queue. Requests that need an
//! answer carry a one-shot reply channel; waiting on that reply is the
//! cross-thread barrier, since the worker handles events strictly in order.
//!
//! ```text
//!  caller ──GeEvent──▶ [bounded queue] ──▶ worker (GeProcessor + GuestMemory)
//!     ▲                                        │
//!     └──────────── reply channel ◀────────────┘
//! ```
//!
//! Break requests bypass the queue through a [`BreakHandle`], so a list
//! that never yields can still be interrupted.

use super::backend::RenderBackend;
use super::debug::GeSnapshot;
use super::display_list::ListId;
use super::engine::{BreakHandle, BreakMode, GeStats};
use super::processor::{DrawStatus, GeProcessor, ListStatus};
use crate::core::error::{GeError, Result};
use crate::core::memory::GuestMemory;
use crossbeam_channel::{Receiver, Sender};
use std::thread::JoinHandle;

type Reply<T> = Sender<T>;

/// Messages handled by the worker thread, in order
enum GeEvent {
    Enqueue {
        pc: u32,
        stall: u32,
        head: bool,
        reply: Reply<Result<ListId>>,
    },
    Dequeue {
        id: ListId,
        reply: Reply<Result<()>>,
    },
    UpdateStall {
        id: ListId,
        stall: u32,
        reply: Reply<Result<()>>,
    },
    Continue {
        reply: Reply<Result<()>>,
    },
    Break {
        mode: BreakMode,
        reply: Reply<Result<()>>,
    },
    Run {
        budget: u32,
        reply: Reply<u32>,
    },
    MemoryCopy {
        dst: u32,
        src: u32,
        size: u32,
        reply: Reply<Result<()>>,
    },
    MemorySet {
        dst: u32,
        value: u8,
        size: u32,
        reply: Reply<Result<()>>,
    },
    /// Generic CPU write; nobody waits for it
    Invalidate {
        address: u32,
        size: u32,
    },
    FramebufferDirty {
        reply: Reply<bool>,
    },
    WriteWords {
        address: u32,
        words: Vec<u32>,
        reply: Reply<Result<()>>,
    },
    ReadWords {
        address: u32,
        count: u32,
        reply: Reply<Result<Vec<u32>>>,
    },
    ListSync {
        id: ListId,
        reply: Reply<Result<ListStatus>>,
    },
    DrawSync {
        reply: Reply<DrawStatus>,
    },
    Stats {
        reply: Reply<GeStats>,
    },
    Snapshot {
        reply: Reply<Box<GeSnapshot>>,
    },
    /// Barrier: answered once every earlier event has been handled
    Sync {
        reply: Reply<()>,
    },
    Shutdown,
}

/// Handle to a GE processor running on its own thread
pub struct GeWorker<B: RenderBackend + Send + 'static> {
    events: Sender<GeEvent>,
    handle: Option<JoinHandle<(GeProcessor<B>, GuestMemory)>>,
    break_handle: BreakHandle,
}

impl<B: RenderBackend + Send + 'static> GeWorker<B> {
    /// Start the worker thread
    ///
    /// The event queue holds `event_queue_capacity` events from the
    /// processor's configuration; senders block while it is full.
    ///
    /// # Returns
    ///
    /// - `Ok(GeWorker)` once the thread is running
    /// - `Err(EmulatorError::Io)` if the thread could not be spawned
    pub fn spawn(processor: GeProcessor<B>, memory: GuestMemory) -> Result<Self> {
        let capacity = processor.engine().config().event_queue_capacity as usize;
        let (events, queue) = crossbeam_channel::bounded(capacity);
        let break_handle = processor.break_handle();

        let handle = std::thread::Builder::new()
            .name("ge-worker".to_string())
            .spawn(move || worker_loop(processor, memory, queue))?;

        log::info!("GE worker started (queue capacity {})", capacity);
        Ok(Self {
            events,
            handle: Some(handle),
            break_handle,
        })
    }

    /// Request a break without waiting for queued events
    pub fn break_handle(&self) -> BreakHandle {
        self.break_handle.clone()
    }

    pub fn enqueue(&mut self, pc: u32, stall: u32, head: bool) -> Result<ListId> {
        self.request(|reply| GeEvent::Enqueue {
            pc,
            stall,
            head,
            reply,
        })?
    }

    pub fn dequeue(&mut self, id: ListId) -> Result<()> {
        self.request(|reply| GeEvent::Dequeue { id, reply })?
    }

    pub fn update_stall(&mut self, id: ListId, stall: u32) -> Result<()> {
        self.request(|reply| GeEvent::UpdateStall { id, stall, reply })?
    }

    pub fn continue_list(&mut self) -> Result<()> {
        self.request(|reply| GeEvent::Continue { reply })?
    }

    /// Break through the queue, after every earlier event
    pub fn break_lists(&mut self, mode: BreakMode) -> Result<()> {
        self.request(|reply| GeEvent::Break { mode, reply })?
    }

    /// Run queued lists for at most `budget` commands and wait for the result
    pub fn run(&mut self, budget: u32) -> Result<u32> {
        self.request(|reply| GeEvent::Run { budget, reply })
    }

    /// Guest memcpy; returns once the worker has copied and invalidated
    pub fn perform_memory_copy(&mut self, dst: u32, src: u32, size: u32) -> Result<()> {
        self.request(|reply| GeEvent::MemoryCopy {
            dst,
            src,
            size,
            reply,
        })?
    }

    pub fn perform_memory_set(&mut self, dst: u32, value: u8, size: u32) -> Result<()> {
        self.request(|reply| GeEvent::MemorySet {
            dst,
            value,
            size,
            reply,
        })?
    }

    /// Queue a `Safe` invalidation without waiting
    pub fn invalidate_cache(&mut self, address: u32, size: u32) -> Result<()> {
        self.send(GeEvent::Invalidate { address, size })
    }

    pub fn framebuffer_dirty(&mut self) -> Result<bool> {
        self.request(|reply| GeEvent::FramebufferDirty { reply })
    }

    /// Write words into the worker's guest memory
    pub fn write_words(&mut self, address: u32, words: &[u32]) -> Result<()> {
        let words = words.to_vec();
        self.request(|reply| GeEvent::WriteWords {
            address,
            words,
            reply,
        })?
    }

    pub fn read_words(&mut self, address: u32, count: u32) -> Result<Vec<u32>> {
        self.request(|reply| GeEvent::ReadWords {
            address,
            count,
            reply,
        })?
    }

    pub fn list_sync(&mut self, id: ListId) -> Result<ListStatus> {
        self.request(|reply| GeEvent::ListSync { id, reply })?
    }

    pub fn draw_sync(&mut self) -> Result<DrawStatus> {
        self.request(|reply| GeEvent::DrawSync { reply })
    }

    pub fn stats(&mut self) -> Result<GeStats> {
        self.request(|reply| GeEvent::Stats { reply })
    }

    pub fn snapshot(&mut self) -> Result<GeSnapshot> {
        self.request(|reply| GeEvent::Snapshot { reply }).map(|snapshot| *snapshot)
    }

    /// Block until the worker has handled every event sent so far
    pub fn sync(&mut self) -> Result<()> {
        self.request(|reply| GeEvent::Sync { reply })
    }

    /// Stop the worker and take back the processor and memory
    pub fn shutdown(mut self) -> Result<(GeProcessor<B>, GuestMemory)> {
        let handle = self.handle.take().ok_or(GeError::WorkerDisconnected)?;
        self.send(GeEvent::Shutdown)?;
        let parts = handle.join().map_err(|_| GeError::WorkerDisconnected)?;
        log::info!("GE worker stopped");
        Ok(parts)
    }

    fn send(&self, event: GeEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| GeError::WorkerDisconnected.into())
    }

    /// Send an event and wait for its reply
    fn request<T>(&self, event: impl FnOnce(Reply<T>) -> GeEvent) -> Result<T> {
        let (reply, answer) = crossbeam_channel::bounded(1);
        self.send(event(reply))?;
        answer.recv().map_err(|_| GeError::WorkerDisconnected.into())
    }
}

impl<B: RenderBackend + Send + 'static> Drop for GeWorker<B> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if self.events.send(GeEvent::Shutdown).is_ok() {
                let _ = handle.join();
            }
        }
    }
}

fn worker_loop<B: RenderBackend>(
    mut ge: GeProcessor<B>,
    mut mem: GuestMemory,
    queue: Receiver<GeEvent>,
) -> (GeProcessor<B>, GuestMemory) {
    // A dropped reply receiver only means the caller stopped waiting
    for event in queue.iter() {
        match event {
            GeEvent::Enqueue {
                pc,
                stall,
                head,
                reply,
            } => {
                let _ = reply.send(ge.enqueue(&mem, pc, stall, head));
            }
            GeEvent::Dequeue { id, reply } => {
                let _ = reply.send(ge.dequeue(id));
            }
            GeEvent::UpdateStall { id, stall, reply } => {
                let _ = reply.send(ge.update_stall(id, stall));
            }
            GeEvent::Continue { reply } => {
                let _ = reply.send(ge.continue_list());
            }
            GeEvent::Break { mode, reply } => {
                let _ = reply.send(ge.break_lists(mode));
            }
            GeEvent::Run { budget, reply } => {
                let _ = reply.send(ge.run(&mut mem, budget));
            }
            GeEvent::MemoryCopy {
                dst,
                src,
                size,
                reply,
            } => {
                let _ = reply.send(ge.perform_memory_copy(&mut mem, dst, src, size));
            }
            GeEvent::MemorySet {
                dst,
                value,
                size,
                reply,
            } => {
                let _ = reply.send(ge.perform_memory_set(&mut mem, dst, value, size));
            }
            GeEvent::Invalidate { address, size } => ge.invalidate_cache(address, size),
            GeEvent::FramebufferDirty { reply } => {
                let _ = reply.send(ge.framebuffer_dirty());
            }
            GeEvent::WriteWords {
                address,
                words,
                reply,
            } => {
                let _ = reply.send(mem.write_words(address, &words));
            }
            GeEvent::ReadWords {
                address,
                count,
                reply,
            } => {
                let words = (0..count)
                    .map(|i| mem.read_u32(address.wrapping_add(i * 4)))
                    .collect::<Result<Vec<u32>>>();
                let _ = reply.send(words);
            }
            GeEvent::ListSync { id, reply } => {
                let _ = reply.send(ge.list_sync(id));
            }
            GeEvent::DrawSync { reply } => {
                let _ = reply.send(ge.draw_sync());
            }
            GeEvent::Stats { reply } => {
                let _ = reply.send(ge.stats());
            }
            GeEvent::Snapshot { reply } => {
                let _ = reply.send(Box::new(ge.snapshot()));
            }
            GeEvent::Sync { reply } => {
                let _ = reply.send(());
            }
            GeEvent::Shutdown => break,
        }
    }

    ge.engine_mut().flush();
    (ge, mem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GeConfig;
    use crate::core::ge::command::{opcodes, CommandWord};
    use crate::core::ge::listener::NullListener;
    use crate::core::ge::NullBackend;

    const LIST: u32 = 0x0880_0000;

    fn worker() -> GeWorker<NullBackend> {
        let mut config = GeConfig::default();
        config.threaded = true;
        config.event_queue_capacity = 4;
        let ge = GeProcessor::new(config, NullBackend::new(), Box::new(NullListener)).unwrap();
        GeWorker::spawn(ge, GuestMemory::new()).unwrap()
    }

    #[test]
    fn test_worker_runs_list() {
        let mut worker = worker();
        worker
            .write_words(
                LIST,
                &[
                    CommandWord::new(opcodes::FINISH, 0).0,
                    CommandWord::new(opcodes::END, 0).0,
                ],
            )
            .unwrap();

        let id = worker.enqueue(LIST, 0, false).unwrap();
        assert_eq!(worker.run(100).unwrap(), 2);
        assert_eq!(worker.list_sync(id).unwrap(), ListStatus::Completed);
        assert_eq!(worker.draw_sync().unwrap(), DrawStatus::Completed);

        let (ge, _mem) = worker.shutdown().unwrap();
        assert_eq!(ge.stats().lists_completed, 1);
    }

    #[test]
    fn test_memory_operations_are_ordered() {
        let mut worker = worker();
        worker.write_words(LIST, &[1, 2, 3, 4]).unwrap();

        worker.perform_memory_copy(LIST + 0x100, LIST, 16).unwrap();
        worker.perform_memory_set(LIST, 0, 8).unwrap();
        worker.invalidate_cache(LIST, 16).unwrap();
        worker.sync().unwrap();

        assert_eq!(worker.read_words(LIST, 4).unwrap(), vec![0, 0, 3, 4]);
        assert_eq!(worker.read_words(LIST + 0x100, 4).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(worker.snapshot().unwrap().invalidation.safe, 1);
        // No render target has been bound yet
        assert!(worker.framebuffer_dirty().unwrap());
    }

    #[test]
    fn test_errors_cross_the_queue() {
        let mut worker = worker();

        assert!(worker.enqueue(LIST + 2, 0, false).is_err());
        assert!(worker.continue_list().is_err());
        assert!(worker.read_words(0, 1).is_err());
    }

    #[test]
    fn test_drop_stops_worker() {
        let mut worker = worker();
        worker.sync().unwrap();
        drop(worker);
    }
}
