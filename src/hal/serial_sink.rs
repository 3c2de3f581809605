// src/hal/serial_sink.rs
//! Non-blocking output emitter backed by a bounded lock-free queue
//!
//! Tick context pushes one byte per tick into the queue and never waits. A
//! drain thread moves queued bytes into any `std::io::Write`: a serial
//! device node, a file or stdout. When the writer falls behind, the queue
//! fills and further bytes are dropped and counted.

use crate::config::constants::output::{DRAIN_BATCH_SIZE, DRAIN_IDLE_SLEEP_US};
use crate::error::{EmgError, EmgResult};
use crate::hal::traits::LevelSink;
use crate::hal::types::SinkCounters;
use crossbeam::queue::ArrayQueue;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Default)]
struct SharedCounters {
    accepted: AtomicU64,
    dropped: AtomicU64,
    written: AtomicU64,
}

impl SharedCounters {
    fn snapshot(&self) -> SinkCounters {
        SinkCounters {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
        }
    }
}

/// Producer half, owned by the tick routine
pub struct QueuedSink {
    queue: Arc<ArrayQueue<u8>>,
    counters: Arc<SharedCounters>,
}

/// Consumer half, moves bytes to a writer
pub struct SinkDrain {
    queue: Arc<ArrayQueue<u8>>,
    counters: Arc<SharedCounters>,
}

/// Create a connected sink and drain with room for `capacity` bytes
pub fn queued_sink(capacity: usize) -> EmgResult<(QueuedSink, SinkDrain)> {
    if capacity == 0 {
        return Err(EmgError::configuration("output queue", "capacity must be non-zero"));
    }

    let queue = Arc::new(ArrayQueue::new(capacity));
    let counters = Arc::new(SharedCounters::default());
    Ok((
        QueuedSink {
            queue: Arc::clone(&queue),
            counters: Arc::clone(&counters),
        },
        SinkDrain { queue, counters },
    ))
}

impl QueuedSink {
    pub fn counters(&self) -> SinkCounters {
        self.counters.snapshot()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl LevelSink for QueuedSink {
    #[inline]
    fn write_level(&mut self, byte: u8) {
        match self.queue.push(byte) {
            Ok(()) => self.counters.accepted.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.counters.dropped.fetch_add(1, Ordering::Relaxed),
        };
    }
}

impl SinkDrain {
    /// Write everything currently queued; returns the byte count
    pub fn drain_into<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<usize> {
        let mut batch = [0u8; DRAIN_BATCH_SIZE];
        let mut total = 0;

        loop {
            let mut len = 0;
            while len < batch.len() {
                match self.queue.pop() {
                    Some(byte) => {
                        batch[len] = byte;
                        len += 1;
                    }
                    None => break,
                }
            }
            if len == 0 {
                break;
            }

            writer.write_all(&batch[..len])?;
            self.counters.written.fetch_add(len as u64, Ordering::Relaxed);
            total += len;
        }

        if total > 0 {
            writer.flush()?;
        }
        Ok(total)
    }

    pub fn counters(&self) -> SinkCounters {
        self.counters.snapshot()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drain on a background thread until the handle is finished
    pub fn spawn<W: Write + Send + 'static>(self, mut writer: W) -> EmgResult<DrainHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("emg-le-drain".to_string())
            .spawn(move || -> io::Result<SinkCounters> {
                let mut reported_drops = 0;
                loop {
                    let stopping = stop_flag.load(Ordering::Acquire);
                    let moved = self.drain_into(&mut writer)?;

                    let dropped = self.counters.dropped.load(Ordering::Relaxed);
                    if dropped > reported_drops {
                        tracing::warn!(
                            dropped = dropped - reported_drops,
                            total = dropped,
                            "output queue full, bytes dropped"
                        );
                        reported_drops = dropped;
                    }

                    if stopping && self.queue.is_empty() {
                        break;
                    }
                    if moved == 0 {
                        thread::sleep(Duration::from_micros(DRAIN_IDLE_SLEEP_US));
                    }
                }
                writer.flush()?;
                Ok(self.counters.snapshot())
            })?;

        Ok(DrainHandle { stop, thread })
    }
}

/// Running drain thread
pub struct DrainHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<io::Result<SinkCounters>>,
}

impl DrainHandle {
    /// Flush what is queued, stop the thread and return final counters
    pub fn finish(self) -> EmgResult<SinkCounters> {
        self.stop.store(true, Ordering::Release);
        let counters = self
            .thread
            .join()
            .map_err(|_| EmgError::Thread("drain thread panicked".to_string()))??;

        tracing::debug!(
            written = counters.written,
            dropped = counters.dropped,
            "output drain finished"
        );
        Ok(counters)
    }
}
