// tests/envelope_scenarios.rs
//! End-to-end scenarios for the per-tick envelope pipeline

use emg_le::hal::simulator::{
    ActivationPattern, ConstantSource, ReplaySource, SimulatedEmgSource, SimulatorConfig,
};
use emg_le::{EmgLePipeline, EnvelopeLevel, EnvelopePipeline, EnvelopeTask};
use std::time::Duration;

/// Raw samples whose first differences follow `diffs`, starting from `start`
fn samples_from_diffs(start: u16, diffs: &[i32], repeat: usize) -> Vec<u16> {
    let mut value = i32::from(start);
    let mut samples = Vec::with_capacity(diffs.len() * repeat);
    for _ in 0..repeat {
        for d in diffs {
            value += d;
            samples.push(value as u16);
        }
    }
    samples
}

#[test]
fn test_midpoint_input_settles_to_zero() {
    let mut pipeline = EmgLePipeline::new();
    for _ in 0..200 {
        pipeline.process_sample(512);
    }

    assert_eq!(pipeline.comb().running_sum(), 0);
    assert_eq!(pipeline.level(), EnvelopeLevel::ZERO);
    assert_eq!(pipeline.windows_completed(), 1);
}

#[test]
fn test_alternating_differences_small_pipeline() {
    // Differences 10, -10, 10, -10 leave running sums 10, 0, 10, 0
    let samples = samples_from_diffs(512, &[10, -10, 10, -10], 1);
    let mut pipeline = EnvelopePipeline::<4, 2>::new();

    let outputs: Vec<_> = samples.iter().map(|&s| pipeline.process_sample(s)).collect();
    let filtered: Vec<i32> = outputs.iter().map(|o| o.filter_output).collect();
    assert_eq!(filtered, vec![10, 0, 10, 0]);

    let expected = filtered.iter().map(|v| v.unsigned_abs()).sum::<u32>() >> 2;
    assert_eq!(outputs[3].published, Some(EnvelopeLevel(expected as u16)));
    assert_eq!(pipeline.level(), EnvelopeLevel(5));
}

#[test]
fn test_alternating_filter_output_small_pipeline() {
    // Differences chosen so the running sum itself alternates 10, -10
    let samples = samples_from_diffs(512, &[10, -20, 20, -20], 1);
    let mut pipeline = EnvelopePipeline::<4, 2>::new();

    let published = pipeline.process_block(&samples);
    assert_eq!(published, vec![EnvelopeLevel((10 + 10 + 10 + 10) >> 2)]);
}

#[test]
fn test_warm_up_with_zeroed_taps() {
    let mut pipeline = EmgLePipeline::new();
    for raw in [0u16, 1023, 0, 1023, 1023, 0] {
        pipeline.process_sample(raw);
        assert_eq!(pipeline.comb().running_sum(), pipeline.comb().recompute_sum());
    }
    // Rail-to-rail swings stay within the converter range during warm-up
    assert!(pipeline.comb().running_sum().unsigned_abs() <= 1023);
}

#[test]
fn test_step_input_level() {
    // A step of +88 stays in the running sum for exactly TAPS ticks
    let mut pipeline = EmgLePipeline::new();
    let published = pipeline.process_block(&[600u16; 256]);

    assert_eq!(published.len(), 2);
    assert_eq!(published[0], EnvelopeLevel((88 * 20) >> 7));
    assert_eq!(published[1], EnvelopeLevel::ZERO);
}

#[test]
fn test_output_byte_is_low_byte_of_level() {
    // A full-scale square wave with period 2 * TAPS keeps the running sum
    // at +-1023 on every tick, so the level exceeds one byte
    let mut square = Vec::new();
    for _ in 0..16 {
        square.extend(std::iter::repeat(1023u16).take(20));
        square.extend(std::iter::repeat(0u16).take(20));
    }
    let mut pipeline = EmgLePipeline::with_midpoint(0);
    let mut last = None;
    for &raw in &square {
        let out = pipeline.process_sample(raw);
        assert_eq!(out.byte, pipeline.level().to_byte());
        if let Some(level) = out.published {
            last = Some(level);
        }
    }

    let level = last.unwrap();
    assert!(!level.fits_byte());
    assert_eq!(level.to_byte(), (level.value() & 0xFF) as u8);
}

#[test]
fn test_constant_source_task_emits_zero_bytes() {
    let mut task = EnvelopeTask::<_, Vec<u8>, 20, 7>::with_pipeline(
        ConstantSource(512),
        Vec::new(),
        EmgLePipeline::new(),
    );
    for _ in 0..300 {
        task.tick();
    }
    assert!(task.sink().iter().all(|&b| b == 0));
}

#[test]
fn test_replayed_recording_is_deterministic() {
    let recording: Vec<u16> = (0..500).map(|i| 512 + ((i * 37) % 200) as u16).collect();

    let run = || {
        let source = ReplaySource::new(recording.clone()).unwrap();
        let mut task = EnvelopeTask::<_, Vec<u8>, 20, 7>::new(source, Vec::new());
        for _ in 0..1000 {
            task.tick();
        }
        task.into_parts().1
    };
    assert_eq!(run(), run());
}

#[test]
fn test_simulated_activity_raises_envelope() {
    let tick = Duration::from_micros(833);
    let level_for = |pattern: ActivationPattern| {
        let config = SimulatorConfig {
            pattern,
            seed: Some(42),
            ..Default::default()
        };
        let source = SimulatedEmgSource::reference(config, tick).unwrap();
        let mut task = EnvelopeTask::<_, Vec<u8>, 20, 7>::new(source, Vec::new());
        let mut levels = Vec::new();
        for _ in 0..(128 * 20) {
            if let Some(level) = task.tick().published {
                levels.push(u32::from(level.value()));
            }
        }
        // Skip the warm-up window
        levels[1..].iter().sum::<u32>() / (levels.len() as u32 - 1)
    };

    let rest = level_for(ActivationPattern::Rest);
    let active = level_for(ActivationPattern::Constant { level: 1.0 });
    assert!(
        active > rest * 4,
        "active envelope {} not well above rest {}",
        active,
        rest
    );
}

#[test]
fn test_comb_rejects_notch_frequency_hum() {
    // 60 Hz hum sampled at 1200 Hz repeats every 20 ticks and cancels
    let config = SimulatorConfig {
        pattern: ActivationPattern::Rest,
        noise_level: 0.0,
        hum_amplitude: 200.0,
        hum_frequency_hz: 60.0,
        seed: Some(1),
        ..Default::default()
    };
    let tick = Duration::from_secs_f64(1.0 / 1200.0);
    let source = SimulatedEmgSource::reference(config, tick).unwrap();
    let mut task = EnvelopeTask::<_, Vec<u8>, 20, 7>::new(source, Vec::new());

    let mut levels = Vec::new();
    for _ in 0..(128 * 10) {
        if let Some(level) = task.tick().published {
            levels.push(level.value());
        }
    }
    // Rounding to ADC counts leaves at most a couple of counts
    assert!(levels[1..].iter().all(|&l| l <= 2), "levels: {:?}", levels);
}
