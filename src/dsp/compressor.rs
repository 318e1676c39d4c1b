//! Compressor effect
//!
//! RMS detector with attack/decay smoothing in dB driving a static gain
//! curve. Ratios above 1 compress, negative ratios subtract
//! `overvolume * |ratio|` (upward expansion of the reduction).

use super::effect::{check_inputs, DspKind, Effect};
use super::envelope::{time_to_coeff, EnvelopeDetector};
use crate::engine::{db_to_amp, Buffer};
use crate::error::{DspError, Result};
use serde::{Deserialize, Serialize};

/// Compressor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams {
    /// Activation threshold in dB
    pub threshold: f32,
    /// Positive values above 1 let 1/ratio of the overvolume through;
    /// negative values subtract overvolume * |ratio|
    pub ratio: f32,
    /// Attack time in ms
    pub attack: f32,
    /// Decay time in ms
    pub decay: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold: -12.0,
            ratio: 1.0,
            attack: 10.0,
            decay: 100.0,
        }
    }
}

impl CompressorParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(DspError::invalid_param(
                "threshold",
                self.threshold,
                "finite dB value",
            ));
        }
        if !self.ratio.is_finite() {
            return Err(DspError::invalid_param("ratio", self.ratio, "finite value"));
        }
        if !self.attack.is_finite() || self.attack < 0.0 {
            return Err(DspError::invalid_param("attack", self.attack, ">= 0 ms"));
        }
        if !self.decay.is_finite() || self.decay < 0.0 {
            return Err(DspError::invalid_param("decay", self.decay, ">= 0 ms"));
        }
        Ok(())
    }

    /// Fraction of the overvolume removed by the gain curve
    pub fn overgain_factor(&self) -> f32 {
        if self.ratio > 1.0 {
            1.0 - 1.0 / self.ratio
        } else if self.ratio < 0.0 {
            -self.ratio
        } else {
            0.0
        }
    }
}

/// Per-channel compressor state
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    pub params: CompressorParams,
    detector: EnvelopeDetector,
    /// Last applied gain in dB, for monitoring
    gain: f32,
}

impl Compressor {
    /// Create a compressor with the given parameters
    pub fn new(params: CompressorParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Last applied gain in dB (0 or negative when compressing)
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Smoothed detector level in dB
    pub fn attenuation(&self) -> f32 {
        self.detector.attenuation()
    }
}

impl Effect for Compressor {
    const KIND: DspKind = DspKind::Compressor;

    fn process(buffer: &mut Buffer<'_>, states: &mut [Self]) -> Result<()> {
        check_inputs(buffer, states)?;
        let frames = buffer.frames();
        let channels = buffer.channels();
        let stride = buffer.stride();
        let samplerate = buffer.samplerate();
        let samples = buffer.samples_mut();

        for (c, state) in states.iter_mut().enumerate().take(channels) {
            let attack = time_to_coeff(state.params.attack, samplerate);
            let decay = time_to_coeff(state.params.decay, samplerate);
            let overgain = state.params.overgain_factor();
            let threshold = state.params.threshold;

            for i in 0..frames {
                let s = i * stride + c;
                let level = state.detector.detect(samples[s], samplerate, attack, decay)?;
                let gain = if level > threshold {
                    overgain * (threshold - level)
                } else {
                    0.0
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
    }
}
