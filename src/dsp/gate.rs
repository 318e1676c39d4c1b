//! Noise gate effect
//!
//! Shares the compressor's detector. Above the threshold the signal passes
//! untouched; below it the gain falls by 10 dB for every dB the smoothed level
//! sits under the threshold. An optional activation chain shapes the detector
//! signal (e.g. a high-pass so rumble does not open the gate) without
//! affecting the audio path.

use super::chain::Chain;
use super::effect::{check_inputs, DspKind, Effect};
use super::envelope::{time_to_coeff, EnvelopeDetector, DETECTOR_FLOOR_DB};
use crate::engine::{db_to_amp, Buffer};
use crate::error::{DspError, Result};
use serde::{Deserialize, Serialize};

/// Attenuation per dB below threshold
const GATE_SLOPE: f32 = -10.0;

/// Gate parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateParams {
    /// Cutoff threshold in dB
    pub threshold: f32,
    /// Attack time in ms
    pub attack: f32,
    /// Decay time in ms
    pub decay: f32,
}

impl Default for GateParams {
    fn default() -> Self {
        // Threshold at the detector floor keeps the gate open
        Self {
            threshold: DETECTOR_FLOOR_DB,
            attack: 1.0,
            decay: 50.0,
        }
    }
}

impl GateParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(DspError::invalid_param(
                "threshold",
                self.threshold,
                "finite dB value",
            ));
        }
        if !self.attack.is_finite() || self.attack < 0.0 {
            return Err(DspError::invalid_param("attack", self.attack, ">= 0 ms"));
        }
        if !self.decay.is_finite() || self.decay < 0.0 {
            return Err(DspError::invalid_param("decay", self.decay, ">= 0 ms"));
        }
        Ok(())
    }
}

/// Per-channel gate state
#[derive(Debug, Clone, Default)]
pub struct Gate {
    pub params: GateParams,
    detector: EnvelopeDetector,
    /// Last applied gain in dB, for monitoring
    gain: f32,
    /// Effects applied to the detector signal only (single channel)
    pub activation: Chain,
}

impl Gate {
    /// Create a gate with the given parameters and no activation effects
    pub fn new(params: GateParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Create a gate whose detector listens through `activation`
    pub fn with_activation(params: GateParams, activation: Chain) -> Self {
        Self {
            params,
            activation,
            ..Default::default()
        }
    }

    /// Last applied gain in dB (0 when open)
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Smoothed detector level in dB
    pub fn attenuation(&self) -> f32 {
        self.detector.attenuation()
    }
}

impl Effect for Gate {
    const KIND: DspKind = DspKind::Gate;

    fn process(buffer: &mut Buffer<'_>, states: &mut [Self]) -> Result<()> {
        check_inputs(buffer, states)?;
        let channels = buffer.channels();
        for state in states.iter().take(channels) {
            state.activation.check_channels(1)?;
        }

        let frames = buffer.frames();
        let stride = buffer.stride();
        let samplerate = buffer.samplerate();
        let samples = buffer.samples_mut();

        for (c, state) in states.iter_mut().enumerate().take(channels) {
            let attack = time_to_coeff(state.params.attack, samplerate);
            let decay = time_to_coeff(state.params.decay, samplerate);
            let threshold = state.params.threshold;

            for i in 0..frames {
                let s = i * stride + c;
                let mut key = samples[s];
                state
                    .activation
                    .process(&mut Buffer::one_sample(&mut key, samplerate))?;
                let level = state.detector.detect(key, samplerate, attack, decay)?;
                let gain = if level > threshold {
                    0.0
                } else {
                    GATE_SLOPE * (threshold - level)
                };
                state.gain = gain;
                samples[s] *= db_to_amp(gain);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.detector.reset();
        self.gain = 0.0;
        self.activation.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{Filter, Node};

    fn sine(amplitude: f32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48000.0).sin())
            .collect()
    }

    #[test]
    fn test_default_gate_is_open() {
        let input = sine(0.001, 4800);
        let mut buffer = Buffer::from_interleaved(input.clone(), 1, 48000).unwrap();
        let mut states = vec![Gate::default()];
        Gate::process(&mut buffer, &mut states).unwrap();
        assert_eq!(buffer.samples(), input.as_slice());
    }

    #[test]
    fn test_loud_signal_passes() {
        let input = sine(0.8, 9600);
        let mut buffer = Buffer::from_interleaved(input.clone(), 1, 48000).unwrap();
        let mut states = vec![Gate::new(GateParams {
            threshold: -30.0,
            attack: 0.5,
            decay: 50.0,
        })];
        Gate::process(&mut buffer, &mut states).unwrap();
        assert_eq!(states[0].gain(), 0.0);
        assert_eq!(buffer.samples()[9599], input[9599]);
    }

    #[test]
    fn test_quiet_signal_is_attenuated() {
        let mut buffer = Buffer::from_interleaved(sine(0.01, 9600), 1, 48000).unwrap();
        let mut states = vec![Gate::new(GateParams {
            threshold: -30.0,
            attack: 0.5,
            decay: 5.0,
        })];
        Gate::process(&mut buffer, &mut states).unwrap();
        // RMS of the input is about -43 dB, so the gate is 13 dB under threshold
        assert!(states[0].gain() < -100.0);
        assert!(buffer.samples()[9000..].iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn test_activation_chain_shapes_detector_only() {
        // A steep high-pass removes DC from the key, so the gate closes even
        // though the audio path carries a loud DC offset
        let mut activation = Chain::new();
        activation.push(Node::from(vec![Filter::high_pass(2000.0)]));
        let mut states = vec![Gate::with_activation(
            GateParams {
                threshold: -30.0,
                attack: 0.5,
                decay: 5.0,
            },
            activation,
        )];
        let mut buffer = Buffer::from_interleaved(vec![0.5; 9600], 1, 48000).unwrap();
        Gate::process(&mut buffer, &mut states).unwrap();
        assert!(buffer.samples()[9599].abs() < 1e-6);

        let mut open = vec![Gate::new(GateParams {
            threshold: -30.0,
            attack: 0.5,
            decay: 5.0,
        })];
        let mut buffer = Buffer::from_interleaved(vec![0.5; 9600], 1, 48000).unwrap();
        Gate::process(&mut buffer, &mut open).unwrap();
        assert_eq!(buffer.samples()[9599], 0.5);
    }

    #[test]
    fn test_validate() {
        assert!(GateParams::default().validate().is_ok());
        let params = GateParams {
            decay: f32::INFINITY,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
