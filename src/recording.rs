// src/recording.rs
//! CSV recording of published envelope levels
//!
//! One row per completed window: `timestamp_us,level`. Rows come from
//! `LevelMonitor` snapshots, so recording never touches the tick path.

use crate::error::{EmgError, EmgResult};
use crate::processing::pipeline::PipelineSnapshot;
use crate::task::SnapshotEvents;
use crate::utils::time::{ElapsedTimeProvider, TimeProvider};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::thread::{self, JoinHandle};

pub const CSV_HEADER: &str = "timestamp_us,level";

/// Appends level rows to any writer
pub struct LevelRecorder<W: Write> {
    writer: W,
    clock: Box<dyn TimeProvider>,
    rows: u64,
}

impl LevelRecorder<BufWriter<File>> {
    /// Create (or truncate) a CSV file, timestamps relative to now
    pub fn create<P: AsRef<Path>>(path: P) -> EmgResult<Self> {
        let file = File::create(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "recording levels");
        Self::new(BufWriter::new(file), Box::new(ElapsedTimeProvider::new())).map_err(EmgError::from)
    }
}

impl<W: Write> LevelRecorder<W> {
    /// Wrap `writer` and emit the header row
    pub fn new(mut writer: W, clock: Box<dyn TimeProvider>) -> io::Result<Self> {
        writeln!(writer, "{}", CSV_HEADER)?;
        Ok(Self {
            writer,
            clock,
            rows: 0,
        })
    }

    pub fn record(&mut self, snapshot: &PipelineSnapshot) -> io::Result<()> {
        writeln!(
            self.writer,
            "{},{}",
            self.clock.now_micros(),
            snapshot.level.value()
        )?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and return the number of rows written
    pub fn finish(mut self) -> io::Result<u64> {
        self.writer.flush()?;
        Ok(self.rows)
    }

    pub fn into_inner(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Record every snapshot from `events` on a background thread.
///
/// The thread ends once every sending monitor is dropped. Snapshots the
/// monitor could not enqueue are reported as warnings.
pub fn spawn_recorder<W>(
    events: SnapshotEvents,
    mut recorder: LevelRecorder<W>,
) -> EmgResult<RecorderHandle>
where
    W: Write + Send + 'static,
{
    let thread = thread::Builder::new()
        .name("emg-le-record".to_string())
        .spawn(move || -> io::Result<RecordingStats> {
            let mut reported_drops = 0;
            let report_drops = |reported: &mut u64| {
                let dropped = events.dropped();
                if dropped > *reported {
                    tracing::warn!(
                        dropped = dropped - *reported,
                        total = dropped,
                        "recorder fell behind, level rows dropped"
                    );
                    *reported = dropped;
                }
            };

            for snapshot in events.iter() {
                recorder.record(&snapshot)?;
                report_drops(&mut reported_drops);
            }
            report_drops(&mut reported_drops);

            Ok(RecordingStats {
                rows: recorder.finish()?,
                dropped: reported_drops,
            })
        })?;

    Ok(RecorderHandle { thread })
}

/// Final counts of a recording
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordingStats {
    pub rows: u64,
    /// Window snapshots that never reached the recorder
    pub dropped: u64,
}

pub struct RecorderHandle {
    thread: JoinHandle<io::Result<RecordingStats>>,
}

impl RecorderHandle {
    /// Wait for the event channel to close and return the final counts
    pub fn join(self) -> EmgResult<RecordingStats> {
        let stats = self
            .thread
            .join()
            .map_err(|_| EmgError::Thread("recorder thread panicked".to_string()))??;
        tracing::info!(rows = stats.rows, dropped = stats.dropped, "recording closed");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::envelope::EnvelopeLevel;
    use crate::utils::time::MockTimeProvider;
    use crossbeam::channel::bounded;

    fn snapshot(level: u16) -> PipelineSnapshot {
        PipelineSnapshot {
            level: EnvelopeLevel(level),
            ..Default::default()
        }
    }

    #[test]
    fn test_rows_follow_header() {
        let clock = MockTimeProvider::new(0);
        clock.set_time(106_624_000);
        let mut recorder = LevelRecorder::new(Vec::new(), Box::new(clock)).unwrap();
        recorder.record(&snapshot(42)).unwrap();
        recorder.record(&snapshot(300)).unwrap();
        assert_eq!(recorder.rows(), 2);

        let text = String::from_utf8(recorder.into_inner().unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec![CSV_HEADER, "106624,42", "106624,300"]);
    }

    #[test]
    fn test_recorder_thread_ends_with_channel() {
        let (tx, rx) = bounded(4);
        let recorder = LevelRecorder::new(Vec::new(), Box::new(MockTimeProvider::new(0))).unwrap();
        let handle = spawn_recorder(SnapshotEvents::from_receiver(rx), recorder).unwrap();
        for level in [1, 2, 3] {
            tx.send(snapshot(level)).unwrap();
        }
        drop(tx);
        assert_eq!(handle.join().unwrap(), RecordingStats { rows: 3, dropped: 0 });
    }

    #[test]
    fn test_recorder_reports_monitor_drops() {
        use crate::hal::simulator::ConstantSource;
        use crate::task::{EnvelopeTask, LevelMonitor};

        // Capacity 1 and no consumer yet: 3 windows, 2 dropped
        let (monitor, events) = LevelMonitor::with_events(1);
        let mut task = EnvelopeTask::<_, Vec<u8>, 4, 2>::new(ConstantSource(512), Vec::new())
            .with_monitor(monitor);
        for _ in 0..12 {
            task.tick();
        }
        drop(task);

        let recorder = LevelRecorder::new(Vec::new(), Box::new(MockTimeProvider::new(0))).unwrap();
        let stats = spawn_recorder(events, recorder).unwrap().join().unwrap();
        assert_eq!(stats, RecordingStats { rows: 1, dropped: 2 });
    }

    #[test]
    fn test_create_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("levels.csv");
        let mut recorder = LevelRecorder::create(&path).unwrap();
        recorder.record(&snapshot(7)).unwrap();
        assert_eq!(recorder.finish().unwrap(), 1);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(CSV_HEADER));
        assert!(text.trim_end().ends_with(",7"));
    }
}
