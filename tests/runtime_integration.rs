// tests/runtime_integration.rs
//! Timer, output queue and recorder wired together as the runner does

use emg_le::hal::serial_sink::queued_sink;
use emg_le::hal::simulator::ConstantSource;
use emg_le::hal::timer::PeriodicTimer;
use emg_le::recording::{spawn_recorder, LevelRecorder, CSV_HEADER};
use emg_le::utils::time::MockTimeProvider;
use emg_le::{EnvelopeLevel, EnvelopeTask, LevelMonitor};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_timer_driven_task_streams_one_byte_per_tick() {
    let (sink, drain) = queued_sink(1 << 16).unwrap();
    let output = SharedBuffer::default();
    let drain = drain.spawn(output.clone()).unwrap();

    let (monitor, events) = LevelMonitor::with_events(64);
    let csv = SharedBuffer::default();
    let recorder = LevelRecorder::new(csv.clone(), Box::new(MockTimeProvider::new(0))).unwrap();
    let recorder = spawn_recorder(events, recorder).unwrap();

    // Step of +40 from the midpoint: first window level 40 * 4 >> 3 = 20
    let task = EnvelopeTask::<_, _, 4, 3>::new(ConstantSource(552), sink).with_monitor(monitor.clone());
    let handle = PeriodicTimer::new(Duration::from_micros(200)).unwrap().start(task).unwrap();
    thread::sleep(Duration::from_millis(50));
    let task = handle.stop().unwrap();

    let ticks = task.pipeline().ticks();
    let windows = task.pipeline().windows_completed();
    assert!(windows >= 2, "only {} windows in {} ticks", windows, ticks);
    assert_eq!(monitor.latest().level, EnvelopeLevel::ZERO);

    drop(task);
    drop(monitor);
    let counters = drain.finish().unwrap();
    let stats = recorder.join().unwrap();

    assert_eq!(counters.dropped, 0);
    assert_eq!(counters.written, ticks);
    assert_eq!(stats.rows, windows);
    assert_eq!(stats.dropped, 0);

    let bytes = output.0.lock().clone();
    assert_eq!(bytes.len() as u64, ticks);
    assert!(bytes[..7].iter().all(|&b| b == 0));
    assert!(bytes[7..15].iter().all(|&b| b == 20));

    let text = String::from_utf8(csv.0.lock().clone()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(CSV_HEADER));
    assert_eq!(lines.next(), Some("0,20"));
    assert_eq!(lines.next(), Some("0,0"));
}
