// src/hal/timer.rs
//! Periodic timer driving a tick handler on a dedicated thread
//!
//! Desktop stand-in for a hardware timer interrupt. Each tick runs the
//! handler to completion before the next one is taken; ticks that arrive
//! while the handler is still busy are coalesced by the ticker channel.

use crate::error::{EmgError, EmgResult};
use crate::hal::traits::TickHandler;
use crossbeam::channel::{bounded, select, tick, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Fixed-interval tick source
#[derive(Debug, Clone, Copy)]
pub struct PeriodicTimer {
    interval: Duration,
}

impl PeriodicTimer {
    pub fn new(interval: Duration) -> EmgResult<Self> {
        if interval.is_zero() {
            return Err(EmgError::configuration("timer", "tick interval must be non-zero"));
        }
        Ok(Self { interval })
    }

    pub fn from_micros(interval_us: u32) -> EmgResult<Self> {
        Self::new(Duration::from_micros(u64::from(interval_us)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Attach `handler` and start ticking; the handler is returned on stop
    pub fn start<H>(&self, mut handler: H) -> EmgResult<TimerHandle<H>>
    where
        H: TickHandler + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ticks = Arc::new(AtomicU64::new(0));
        let tick_count = Arc::clone(&ticks);
        let interval = self.interval;

        let thread = thread::Builder::new()
            .name("emg-le-tick".to_string())
            .spawn(move || {
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            handler.on_tick();
                            tick_count.fetch_add(1, Ordering::Relaxed);
                        }
                        recv(stop_rx) -> _ => break,
                    }
                }
                handler
            })
            .map_err(|e| EmgError::Thread(format!("failed to spawn tick thread: {}", e)))?;

        tracing::info!(interval_us = interval.as_micros() as u64, "periodic timer started");

        Ok(TimerHandle {
            stop_tx,
            ticks,
            thread,
        })
    }
}

/// Running timer; stopping it hands the handler back
pub struct TimerHandle<H> {
    stop_tx: Sender<()>,
    ticks: Arc<AtomicU64>,
    thread: JoinHandle<H>,
}

impl<H> TimerHandle<H> {
    /// Ticks delivered so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.thread.is_finished()
    }

    /// Stop ticking after the current tick and recover the handler
    pub fn stop(self) -> EmgResult<H> {
        // A full channel means a stop is already pending
        let _ = self.stop_tx.try_send(());
        let ticks = self.ticks.load(Ordering::Relaxed);
        let handler = self
            .thread
            .join()
            .map_err(|_| EmgError::Thread("tick handler panicked".to_string()))?;

        tracing::info!(ticks, "periodic timer stopped");
        Ok(handler)
    }
}
