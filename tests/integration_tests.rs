//! Integration Tests
//!
//! End-to-end tests for the AzAudio effects engine.

use std::sync::Arc;

use approx::assert_relative_eq;
use azaudio::config::{NodeConfig, RackConfig, SourceConfig};
use azaudio::dsp::{
    cubic_limiter, Chain, Compressor, CompressorParams, Delay, DelayParams, DspKind, Effect,
    Filter, FilterKind, FilterParams, Gate, GateParams, LookaheadLimiter, LookaheadLimiterParams,
    Node, Reverb, ReverbParams, Rms, Sampler, SamplerParams, LOOKAHEAD_SAMPLES,
};
use azaudio::engine::{db_to_amp, generate_signal, Buffer, SignalKind};
use azaudio::DspError;
use pretty_assertions::assert_eq;
use test_case::test_case;

/// Helper to create an interleaved sine buffer
fn create_sine_buffer(frequency: f32, amplitude: f32, frames: usize, channels: usize) -> Buffer<'static> {
    generate_signal(SignalKind::Sine, frequency, amplitude, frames, channels, 48000).unwrap()
}

/// Neutral single-node rack for `kind`
fn neutral_node(kind: DspKind) -> NodeConfig {
    match kind {
        DspKind::Rms => NodeConfig::Rms,
        DspKind::Filter => NodeConfig::Filter(FilterParams::default()),
        DspKind::LookaheadLimiter => {
            NodeConfig::LookaheadLimiter(LookaheadLimiterParams::default())
        }
        DspKind::Compressor => NodeConfig::Compressor(CompressorParams::default()),
        DspKind::Delay => NodeConfig::Delay {
            params: DelayParams::default(),
            max_delay: None,
            wet_effects: Vec::new(),
        },
        DspKind::Reverb => NodeConfig::Reverb(ReverbParams::default()),
        DspKind::Sampler => NodeConfig::Sampler {
            params: SamplerParams::default(),
            source: SourceConfig {
                signal: SignalKind::Silence,
                ..Default::default()
            },
        },
        DspKind::Gate => NodeConfig::Gate {
            params: GateParams::default(),
            activation: Vec::new(),
        },
        DspKind::CubicLimiter | DspKind::None => NodeConfig::CubicLimiter,
    }
}

// === Buffer Tests ===

#[test]
fn test_buffer_allocation_rules() {
    assert!(matches!(
        Buffer::new(0, 2, 48000),
        Err(DspError::InvalidFrameCount { frames: 0 })
    ));

    let mut buffer = Buffer::new(16, 2, 48000).unwrap();
    assert!(buffer.is_owned());
    assert_eq!(buffer.samples().len(), 32);
    buffer.release().unwrap();
    assert!(matches!(buffer.release(), Err(DspError::NullPointer)));
}

#[test]
fn test_released_buffer_rejected_without_state_change() {
    let mut buffer = Buffer::new(8, 1, 48000).unwrap();
    buffer.release().unwrap();
    let mut states = vec![Rms::new()];
    let err = Rms::process(&mut buffer, &mut states).unwrap_err();
    assert!(matches!(err, DspError::NullPointer));
    assert!(err.is_recoverable());
    assert_eq!(states[0].sum(), 0.0);
}

#[test]
fn test_one_sample_view_mutates_in_place() {
    let mut sample = 3.0_f32;
    let mut view = Buffer::one_sample(&mut sample, 48000);
    cubic_limiter(&mut view).unwrap();
    assert_eq!(sample, 1.0);
}

// === Effect Property Tests ===

#[test_case(0.25 ; "quiet")]
#[test_case(1.0 ; "full scale")]
fn test_rms_tracks_constant_amplitude(amplitude: f32) {
    let mut buffer = Buffer::from_interleaved(vec![amplitude; 256], 1, 48000).unwrap();
    let mut states = vec![Rms::new()];
    Rms::process(&mut buffer, &mut states).unwrap();
    assert!(buffer.samples().iter().all(|&s| s >= 0.0));
    for &s in &buffer.samples()[128..] {
        assert_relative_eq!(s, amplitude, epsilon = 1e-5);
    }
}

#[test]
fn test_rms_of_sine() {
    let mut buffer = create_sine_buffer(375.0, 0.8, 2048, 1);
    let mut states = vec![Rms::new()];
    Rms::process(&mut buffer, &mut states).unwrap();
    // 375 Hz fits exactly one period in the 128 sample window
    assert_relative_eq!(
        buffer.samples()[2047],
        0.8 / 2.0_f32.sqrt(),
        epsilon = 1e-3
    );
}

#[test]
fn test_cubic_limiter_always_bounded() {
    let mut buffer = create_sine_buffer(100.0, 20.0, 4800, 2);
    cubic_limiter(&mut buffer).unwrap();
    assert!(buffer.samples().iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[test]
fn test_lookahead_limiter_ceiling() {
    let mut buffer = create_sine_buffer(1000.0, 4.0, 9600, 2);
    let mut states = vec![
        LookaheadLimiter::new(LookaheadLimiterParams {
            gain_input: 6.0,
            gain_output: -1.0,
        });
        2
    ];
    LookaheadLimiter::process(&mut buffer, &mut states).unwrap();
    let ceiling = db_to_amp(-1.0);
    assert!(buffer.samples().iter().all(|s| s.abs() <= ceiling + 1e-6));
    assert_eq!(LookaheadLimiter::latency(), LOOKAHEAD_SAMPLES);
}

#[test]
fn test_compressor_unity_ratio_is_identity() {
    let input = create_sine_buffer(220.0, 0.9, 4800, 2);
    let mut buffer = Buffer::from_interleaved(input.samples().to_vec(), 2, 48000).unwrap();
    let mut states = vec![Compressor::new(CompressorParams::default()); 2];
    Compressor::process(&mut buffer, &mut states).unwrap();
    assert_eq!(buffer.samples(), input.samples());
}

#[test]
fn test_gate_floor_threshold_is_identity() {
    let input = create_sine_buffer(220.0, 0.01, 4800, 1);
    let mut buffer = Buffer::from_interleaved(input.samples().to_vec(), 1, 48000).unwrap();
    let mut states = vec![Gate::new(GateParams::default())];
    Gate::process(&mut buffer, &mut states).unwrap();
    assert_eq!(buffer.samples(), input.samples());
}

#[test]
fn test_delay_resize_preserves_steady_state() {
    let mut states = vec![Delay::new(DelayParams {
        gain: 0.0,
        gain_dry: -1000.0,
        delay: 5.0,
        feedback: 0.0,
    })];
    let mut buffer = Buffer::from_interleaved(vec![0.5; 4800], 1, 48000).unwrap();
    Delay::process(&mut buffer, &mut states).unwrap();
    let capacity = states[0].line().capacity();

    // Shrink, then grow back within capacity: no reallocation, output settles
    for delay in [2.0, 5.0] {
        states[0].params.delay = delay;
        let mut buffer = Buffer::from_interleaved(vec![0.5; 4800], 1, 48000).unwrap();
        Delay::process(&mut buffer, &mut states).unwrap();
        assert_relative_eq!(buffer.samples()[4799], 0.5, epsilon = 1e-6);
    }
    assert_eq!(states[0].line().capacity(), capacity);
}

#[test]
fn test_reverb_flushes_to_silence() {
    let mut states = Reverb::per_channel(ReverbParams::default(), 1);
    let mut buffer = create_sine_buffer(440.0, 0.5, 4800, 1);
    Reverb::process(&mut buffer, &mut states).unwrap();

    // Twenty times the total tap length of zeros drains every feedback loop
    let flush = states[0].total_delay_samples() * 20;
    let mut silence = Buffer::new(flush, 1, 48000).unwrap();
    Reverb::process(&mut silence, &mut states).unwrap();
    let mut tail = Buffer::new(1024, 1, 48000).unwrap();
    Reverb::process(&mut tail, &mut states).unwrap();
    assert!(tail.samples().iter().all(|s| s.abs() < 1e-4));
}

#[test]
fn test_sampler_reproduces_source() {
    let source = Arc::new(create_sine_buffer(300.0, 0.7, 480, 1));
    let mut states = vec![Sampler::new(SamplerParams::default(), Arc::clone(&source))];
    let mut buffer = Buffer::new(960, 1, 48000).unwrap();
    Sampler::process(&mut buffer, &mut states).unwrap();
    for i in 0..960 {
        assert_relative_eq!(
            buffer.samples()[i],
            source.samples()[i % 480],
            epsilon = 1e-6
        );
    }
}

// === Chain Tests ===

#[test_case(DspKind::Rms ; "rms")]
#[test_case(DspKind::Filter ; "filter")]
#[test_case(DspKind::LookaheadLimiter ; "lookahead limiter")]
#[test_case(DspKind::Compressor ; "compressor")]
#[test_case(DspKind::Delay ; "delay")]
#[test_case(DspKind::Reverb ; "reverb")]
#[test_case(DspKind::Sampler ; "sampler")]
#[test_case(DspKind::Gate ; "gate")]
#[test_case(DspKind::CubicLimiter ; "cubic limiter")]
fn test_silence_through_every_kind(kind: DspKind) {
    let rack = RackConfig {
        channels: 2,
        nodes: vec![neutral_node(kind)],
        ..Default::default()
    };
    let mut chain = rack.build().unwrap();
    assert_eq!(chain.kinds(), vec![kind]);

    let mut buffer = Buffer::new(4, 2, 48000).unwrap();
    chain.process(&mut buffer).unwrap();
    assert_eq!(buffer.samples(), &[0.0; 8]);
}

#[test]
fn test_chain_with_nested_sub_chains() {
    let mut wet = Chain::new();
    wet.push(Node::from(vec![Filter::new(FilterParams {
        kind: FilterKind::LowPass,
        frequency: 500.0,
        dry_mix: 0.0,
    })]));
    let mut key = Chain::new();
    key.push(Node::from(vec![Filter::high_pass(200.0)]));

    let mut chain = Chain::new();
    chain.push(Node::from(vec![Gate::with_activation(
        GateParams::default(),
        key,
    )]));
    chain.push(Node::from(vec![Delay::with_wet_effects(
        DelayParams {
            delay: 2.0,
            feedback: 0.5,
            ..Default::default()
        },
        wet,
    )]));
    chain.push(Node::CubicLimiter);

    let mut buffer = create_sine_buffer(1000.0, 0.9, 4800, 1);
    chain.process(&mut buffer).unwrap();
    assert!(buffer.samples().iter().all(|s| s.is_finite() && s.abs() <= 1.0));
    assert!(buffer.rms_db(0) > -20.0);
}

#[test]
fn test_sub_chain_needs_single_channel_state() {
    let mut activation = Chain::new();
    activation.push(Node::from(Vec::<Rms>::new()));
    let mut states = vec![Gate::with_activation(GateParams::default(), activation)];
    let mut buffer = Buffer::from_interleaved(vec![0.5; 16], 1, 48000).unwrap();
    let err = Gate::process(&mut buffer, &mut states).unwrap_err();
    assert!(matches!(err, DspError::NullPointer));
    assert!(buffer.samples().iter().all(|&s| s == 0.5));
}

#[test]
fn test_chain_reset_restores_initial_output() {
    let rack = RackConfig {
        channels: 1,
        nodes: vec![
            NodeConfig::Compressor(CompressorParams {
                threshold: -30.0,
                ratio: 4.0,
                ..Default::default()
            }),
            NodeConfig::Delay {
                params: DelayParams {
                    delay: 1.0,
                    feedback: 0.5,
                    ..Default::default()
                },
                max_delay: None,
                wet_effects: Vec::new(),
            },
        ],
        ..Default::default()
    };
    let mut chain = rack.build().unwrap();
    let input = create_sine_buffer(440.0, 0.8, 1024, 1);

    let mut first = Buffer::from_interleaved(input.samples().to_vec(), 1, 48000).unwrap();
    chain.process(&mut first).unwrap();
    chain.reset();
    let mut second = Buffer::from_interleaved(input.samples().to_vec(), 1, 48000).unwrap();
    chain.process(&mut second).unwrap();

    assert_eq!(first.samples(), second.samples());
}

#[test]
fn test_struct_sizes_match_kinds() {
    let chain = RackConfig::with_every_kind().build().unwrap();
    for node in chain.iter() {
        let channels = node.channels().unwrap_or(0);
        assert_eq!(node.struct_size(), channels * node.kind().state_size());
    }
}
