//! Desktop runner: simulated sensor -> envelope pipeline -> byte stream

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use emg_le::config::{OutputTarget, SamplingSettings};
use emg_le::hal::serial_sink::queued_sink;
use emg_le::hal::simulator::{ActivationPattern, SimulatedEmgSource};
use emg_le::hal::timer::PeriodicTimer;
use emg_le::recording::{spawn_recorder, LevelRecorder};
use emg_le::{
    ConfigLoader, EmgError, EmgLePipeline, EmgResult, EnvelopeTask, LevelMonitor, SystemConfig,
};
use tracing::Level;

/// Window snapshots buffered for the recorder
const RECORD_QUEUE_DEPTH: usize = 64;

#[derive(Parser, Debug)]
#[command(
    name = "emg-le",
    about = "Run the EMG linear envelope pipeline on a simulated sensor",
    version
)]
struct Cli {
    /// Configuration file; the standard locations are searched when omitted
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(short = 'd', long = "duration-secs", default_value = "10")]
    duration_secs: f64,

    /// Byte output: "-" for stdout or a file path (overrides the config)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Record published levels as timestamp_us,level CSV
    #[arg(short = 'r', long = "record")]
    record: Option<PathBuf>,

    /// Simulated activation: rest, constant, burst, sine or ramp
    #[arg(short = 'p', long = "pattern", value_parser = parse_pattern)]
    pattern: Option<ActivationPattern>,

    /// More log output (repeatable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_pattern(s: &str) -> Result<ActivationPattern, String> {
    s.parse().map_err(|e: EmgError| e.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        _ => Level::TRACE,
    };
    // Logs go to stderr so stdout can carry the byte stream
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let config = load_config(&cli)?;
    run(&cli, config)?;
    Ok(())
}

fn load_config(cli: &Cli) -> EmgResult<SystemConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_file(path)?,
        None => ConfigLoader::new().load_system_config()?,
    };

    if let Some(pattern) = &cli.pattern {
        config.simulator.pattern = pattern.clone();
    }
    if let Some(output) = &cli.output {
        config.output.target = if output == "-" {
            OutputTarget::Stdout
        } else {
            OutputTarget::File { path: PathBuf::from(output) }
        };
    }
    if let Some(record) = &cli.record {
        config.output.record_csv = Some(record.clone());
    }

    config
        .validate_consistency()
        .map_err(emg_le::config::ConfigError::Validation)?;
    Ok(config)
}

fn open_output(target: &OutputTarget) -> EmgResult<Box<dyn Write + Send>> {
    Ok(match target {
        OutputTarget::Stdout => Box::new(io::stdout()),
        OutputTarget::File { path } => Box::new(BufWriter::new(File::create(path)?)),
        OutputTarget::Null => Box::new(io::sink()),
    })
}

fn run(cli: &Cli, config: SystemConfig) -> EmgResult<()> {
    let summary = config.get_summary();
    tracing::info!(
        tick_us = summary.tick_interval_us,
        tick_hz = summary.tick_rate_hz,
        notch_hz = summary.comb_notch_hz,
        window = summary.window_len,
        window_ms = summary.window_ms,
        "envelope pipeline configured"
    );
    if let Ok(json) = summary.to_json() {
        tracing::debug!(summary = %json, "configuration summary");
    }
    if !summary.level_fits_output {
        tracing::warn!(
            adc_bits = summary.adc_resolution_bits,
            "levels above 255 are truncated to their low byte on output"
        );
    }

    let sampling: &SamplingSettings = &config.sampling;
    let source = SimulatedEmgSource::new(
        config.simulator.clone(),
        sampling.tick_interval(),
        sampling.adc_resolution_bits,
    )?;

    let run_for = Duration::try_from_secs_f64(cli.duration_secs)
        .map_err(|e| EmgError::configuration("runner", format!("duration: {}", e)))?;
    let timer = PeriodicTimer::new(sampling.tick_interval())?;

    // Everything that can fail is opened before the drain thread starts
    let (monitor, recorder) = match &config.output.record_csv {
        Some(path) => {
            let file = LevelRecorder::create(path)?;
            let (monitor, events) = LevelMonitor::with_events(RECORD_QUEUE_DEPTH);
            (monitor, Some(spawn_recorder(events, file)?))
        }
        None => (LevelMonitor::new(), None),
    };
    let writer = open_output(&config.output.target)?;
    let (sink, drain) = queued_sink(config.output.queue_capacity)?;
    let drain = drain.spawn(writer)?;

    let pipeline = EmgLePipeline::with_midpoint(sampling.adc_midpoint());
    let task = EnvelopeTask::with_pipeline(source, sink, pipeline).with_monitor(monitor.clone());

    let handle = match timer.start(task) {
        Ok(handle) => handle,
        Err(e) => {
            drain.finish()?;
            return Err(e);
        }
    };
    thread::sleep(run_for);

    let task = handle.stop()?;
    let latest = monitor.latest();
    tracing::info!(
        ticks = task.pipeline().ticks(),
        windows = task.pipeline().windows_completed(),
        level = latest.level.value(),
        "acquisition stopped"
    );

    // Dropping the task and monitor closes the recorder's channel
    let (_, sink, _) = task.into_parts();
    drop(sink);
    drop(monitor);

    let counters = drain.finish()?;
    tracing::info!(
        written = counters.written,
        dropped = counters.dropped,
        "output closed"
    );

    if let Some(recorder) = recorder {
        recorder.join()?;
    }
    Ok(())
}
