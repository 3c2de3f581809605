// src/task.rs
//! Per-tick routine bound to its collaborators
//!
//! `EnvelopeTask` is what gets registered with the timer: every tick it reads
//! one sample, runs the pipeline and writes one byte. Readers outside the
//! tick go through `LevelMonitor`, which only ever sees whole snapshots taken
//! at window boundaries.

use crate::hal::traits::{AnalogSource, LevelSink, TickHandler};
use crate::processing::pipeline::{EnvelopePipeline, PipelineSnapshot, TickOutput};
use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct MonitorShared {
    latest: RwLock<PipelineSnapshot>,
    contended: AtomicU64,
    dropped: Arc<AtomicU64>,
}

/// Read-only view of the pipeline for background contexts.
///
/// Publishing never waits: a boundary that finds a reader holding the slot
/// is skipped and counted, and the next boundary overwrites it.
#[derive(Clone, Default)]
pub struct LevelMonitor {
    shared: Arc<MonitorShared>,
    events: Option<Sender<PipelineSnapshot>>,
}

impl LevelMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monitor that also forwards each window snapshot to a bounded channel.
    ///
    /// Snapshots are dropped and counted when the receiver falls `capacity`
    /// behind.
    pub fn with_events(capacity: usize) -> (Self, SnapshotEvents) {
        let (tx, rx) = bounded(capacity.max(1));
        let shared = Arc::new(MonitorShared::default());
        let events = SnapshotEvents {
            receiver: rx,
            dropped: Arc::clone(&shared.dropped),
        };
        (
            Self {
                shared,
                events: Some(tx),
            },
            events,
        )
    }

    /// Snapshot taken at the most recent published window boundary
    pub fn latest(&self) -> PipelineSnapshot {
        *self.shared.latest.read()
    }

    /// Boundaries whose snapshot was skipped because a reader held the slot
    pub fn contended_publishes(&self) -> u64 {
        self.shared.contended.load(Ordering::Relaxed)
    }

    /// Snapshots not delivered because the event channel was full
    pub fn dropped_events(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    fn publish(&self, snapshot: PipelineSnapshot) {
        match self.shared.latest.try_write() {
            Some(mut slot) => *slot = snapshot,
            None => {
                self.shared.contended.fetch_add(1, Ordering::Relaxed);
            }
        }
        if let Some(events) = &self.events {
            if events.try_send(snapshot).is_err() {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Receiving end of the window snapshot stream
pub struct SnapshotEvents {
    receiver: Receiver<PipelineSnapshot>,
    dropped: Arc<AtomicU64>,
}

impl SnapshotEvents {
    /// Events fed straight from a channel, with a fresh drop counter
    pub fn from_receiver(receiver: Receiver<PipelineSnapshot>) -> Self {
        Self {
            receiver,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn try_recv(&self) -> Result<PipelineSnapshot, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Blocking iterator that ends once every monitor is dropped
    pub fn iter(&self) -> crossbeam::channel::Iter<'_, PipelineSnapshot> {
        self.receiver.iter()
    }

    /// Snapshots the producer could not enqueue so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Sampler → comb filter → envelope accumulator → output emitter
pub struct EnvelopeTask<S, O, const TAPS: usize, const SHIFT: u32> {
    source: S,
    sink: O,
    pipeline: EnvelopePipeline<TAPS, SHIFT>,
    monitor: Option<LevelMonitor>,
}

impl<S, O, const TAPS: usize, const SHIFT: u32> EnvelopeTask<S, O, TAPS, SHIFT>
where
    S: AnalogSource,
    O: LevelSink,
{
    /// Task with a freshly initialized pipeline
    pub fn new(source: S, sink: O) -> Self {
        Self::with_pipeline(source, sink, EnvelopePipeline::new())
    }

    pub fn with_pipeline(source: S, sink: O, pipeline: EnvelopePipeline<TAPS, SHIFT>) -> Self {
        Self {
            source,
            sink,
            pipeline,
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: LevelMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Run one complete tick
    #[inline]
    pub fn tick(&mut self) -> TickOutput {
        let raw = self.source.read_raw();
        let output = self.pipeline.process_sample(raw);
        self.sink.write_level(output.byte);

        if output.published.is_some() {
            if let Some(monitor) = &self.monitor {
                monitor.publish(self.pipeline.snapshot());
            }
        }
        output
    }

    pub fn pipeline(&self) -> &EnvelopePipeline<TAPS, SHIFT> {
        &self.pipeline
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &O {
        &self.sink
    }

    pub fn into_parts(self) -> (S, O, EnvelopePipeline<TAPS, SHIFT>) {
        (self.source, self.sink, self.pipeline)
    }
}

impl<S, O, const TAPS: usize, const SHIFT: u32> TickHandler for EnvelopeTask<S, O, TAPS, SHIFT>
where
    S: AnalogSource,
    O: LevelSink,
{
    fn on_tick(&mut self) {
        self.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::simulator::{ConstantSource, ReplaySource};
    use crate::processing::envelope::EnvelopeLevel;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_one_byte_per_tick() {
        let mut task = EnvelopeTask::<_, Vec<u8>, 4, 2>::new(ConstantSource(512), Vec::new());
        for _ in 0..10 {
            task.on_tick();
        }
        assert_eq!(task.sink().len(), 10);
        assert_eq!(task.pipeline().ticks(), 10);
    }

    #[test]
    fn test_bytes_change_only_at_boundaries() {
        let source = ReplaySource::new(vec![522, 512, 522, 512]).unwrap();
        let mut task = EnvelopeTask::<_, Vec<u8>, 4, 2>::new(source, Vec::new());
        for _ in 0..12 {
            task.tick();
        }

        let (_, bytes, _) = task.into_parts();
        // First window sums 10, 0, 10, 0 -> 20 >> 2; afterwards the taps
        // cancel and the second window publishes zero
        assert_eq!(bytes, vec![0, 0, 0, 5, 5, 5, 5, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_monitor_sees_window_snapshots_only() {
        let (monitor, events) = LevelMonitor::with_events(8);
        let mut task = EnvelopeTask::<_, Vec<u8>, 4, 2>::new(ConstantSource(600), Vec::new())
            .with_monitor(monitor.clone());

        for _ in 0..3 {
            task.tick();
        }
        assert_eq!(monitor.latest(), PipelineSnapshot::default());
        assert!(events.try_recv().is_err());

        task.tick();
        let snap = monitor.latest();
        assert_eq!(snap.window_count, 0);
        assert_eq!(snap.accumulator, 0);
        assert_eq!(snap.windows_completed, 1);
        // 88 on each tick while the step passes through the 4 taps
        assert_eq!(snap.level, EnvelopeLevel(88));
        assert_eq!(events.try_recv().unwrap(), snap);
    }

    #[test]
    fn test_closure_source() {
        let mut next = 500u16;
        let source = move || {
            next += 1;
            next
        };
        let mut task = EnvelopeTask::<_, Vec<u8>, 2, 1>::new(source, Vec::new());
        let out = task.tick();
        assert_eq!(out.filter_output, 501 - 512);
    }

    #[test]
    fn test_boundary_tick_does_not_wait_for_readers() {
        let monitor = LevelMonitor::new();
        let mut task = EnvelopeTask::<_, Vec<u8>, 4, 2>::new(ConstantSource(600), Vec::new())
            .with_monitor(monitor.clone());
        for _ in 0..3 {
            task.tick();
        }

        let (held_tx, held_rx) = bounded::<()>(0);
        let shared = Arc::clone(&monitor.shared);
        let reader = thread::spawn(move || {
            let _guard = shared.latest.read();
            held_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(200));
        });
        held_rx.recv().unwrap();

        let started = Instant::now();
        let out = task.tick();
        let elapsed = started.elapsed();
        reader.join().unwrap();

        assert!(out.is_window_boundary());
        assert!(elapsed < Duration::from_millis(50), "tick took {:?}", elapsed);
        assert_eq!(monitor.contended_publishes(), 1);

        // The next boundary publishes normally once the reader is gone
        for _ in 0..4 {
            task.tick();
        }
        assert_eq!(monitor.latest().windows_completed, 2);
        assert_eq!(monitor.contended_publishes(), 1);
    }

    #[test]
    fn test_full_event_channel_counts_drops() {
        let (monitor, events) = LevelMonitor::with_events(1);
        let mut task = EnvelopeTask::<_, Vec<u8>, 4, 2>::new(ConstantSource(512), Vec::new())
            .with_monitor(monitor.clone());
        for _ in 0..12 {
            task.tick();
        }

        assert_eq!(monitor.dropped_events(), 2);
        assert_eq!(events.dropped(), 2);
        assert_eq!(events.try_recv().unwrap().windows_completed, 1);
        assert!(events.try_recv().is_err());
    }
}
