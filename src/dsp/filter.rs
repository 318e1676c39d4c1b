//! One-pole filters
//!
//! Low-pass: `y = x + a * (y_prev - x)` with `a = exp(-f / fs)`.
//! High-pass: `x - lowpass(x)` with the steeper `a = exp(-8 f / fs)`.
//! Band-pass: low-pass followed by high-pass at the same frequency.

use super::effect::{check_inputs, DspKind, Effect};
use crate::engine::Buffer;
use crate::error::{DspError, Result};
use serde::{Deserialize, Serialize};

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    #[default]
    LowPass,
    HighPass,
    BandPass,
}

/// Filter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    #[serde(rename = "response")]
    pub kind: FilterKind,
    /// Cutoff frequency in Hz
    pub frequency: f32,
    /// Blend with the dry signal: 1 is fully dry, 0 is fully wet
    pub dry_mix: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            kind: FilterKind::LowPass,
            frequency: 1000.0,
            dry_mix: 0.0,
        }
    }
}

impl FilterParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !self.frequency.is_finite() || self.frequency < 0.0 {
            return Err(DspError::invalid_param(
                "frequency",
                self.frequency,
                "finite value >= 0 Hz",
            ));
        }
        if !(0.0..=1.0).contains(&self.dry_mix) {
            return Err(DspError::invalid_param("dry_mix", self.dry_mix, "0 to 1"));
        }
        Ok(())
    }
}

/// Low-pass smoothing coefficient
#[inline]
fn low_pass_coeff(frequency: f32, samplerate: u32) -> f32 {
    (-frequency / samplerate as f32).exp().clamp(0.0, 1.0)
}

/// High-pass smoothing coefficient (steeper rolloff constant)
#[inline]
fn high_pass_coeff(frequency: f32, samplerate: u32) -> f32 {
    (-8.0 * (frequency / samplerate as f32)).exp().clamp(0.0, 1.0)
}

/// Per-channel filter state: previous output(s)
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub params: FilterParams,
    outputs: [f32; 2],
}

impl Filter {
    /// Create a filter with the given parameters
    pub fn new(params: FilterParams) -> Self {
        Self {
            params,
            outputs: [0.0; 2],
        }
    }

    /// Low-pass filter at `frequency`
    pub fn low_pass(frequency: f32) -> Self {
        Self::new(FilterParams {
            kind: FilterKind::LowPass,
            frequency,
            dry_mix: 0.0,
        })
    }

    /// High-pass filter at `frequency`
    pub fn high_pass(frequency: f32) -> Self {
        Self::new(FilterParams {
            kind: FilterKind::HighPass,
            frequency,
            dry_mix: 0.0,
        })
    }

    /// Last output of the first stage
    pub fn output(&self) -> f32 {
        self.outputs[0]
    }
}

impl Effect for Filter {
    const KIND: DspKind = DspKind::Filter;

    fn process(buffer: &mut Buffer<'_>, states: &mut [Self]) -> Result<()> {
        check_inputs(buffer, states)?;
        let frames = buffer.frames();
        let channels = buffer.channels();
        let stride = buffer.stride();
        let samplerate = buffer.samplerate();
        let samples = buffer.samples_mut();

        for (c, state) in states.iter_mut().enumerate().take(channels) {
            let lp = low_pass_coeff(state.params.frequency, samplerate);
            let hp = high_pass_coeff(state.params.frequency, samplerate);
            let dry_mix = state.params.dry_mix;

            for i in 0..frames {
                let s = i * stride + c;
                let x = samples[s];
                let wet = match state.params.kind {
                    FilterKind::LowPass => {
                        state.outputs[0] = x + lp * (state.outputs[0] - x);
                        state.outputs[0]
                    }
                    FilterKind::HighPass => {
                        state.outputs[0] = x + hp * (state.outputs[0] - x);
                        x - state.outputs[0]
                    }
                    FilterKind::BandPass => {
                        state.outputs[0] = x + lp * (state.outputs[0] - x);
                        let low = state.outputs[0];
                        state.outputs[1] = low + hp * (state.outputs[1] - low);
                        low - state.outputs[1]
                    }
                };
                samples[s] = wet + dry_mix * (x - wet);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.outputs = [0.0; 2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run(filter: &mut Filter, input: Vec<f32>) -> Vec<f32> {
        let mut buffer = Buffer::from_interleaved(input, 1, 48000).unwrap();
        Filter::process(&mut buffer, std::slice::from_mut(filter)).unwrap();
        buffer.samples().to_vec()
    }

    #[test]
    fn test_low_pass_recurrence() {
        let mut filter = Filter::low_pass(4800.0);
        let a = (-0.1_f32).exp();
        let output = run(&mut filter, vec![1.0, 1.0]);
        assert_relative_eq!(output[0], 1.0 - a, epsilon = 1e-6);
        assert_relative_eq!(output[1], 1.0 + a * (output[0] - 1.0), epsilon = 1e-6);
        assert_eq!(filter.output(), output[1]);
    }

    #[test]
    fn test_low_pass_passes_dc() {
        let mut filter = Filter::low_pass(1000.0);
        let output = run(&mut filter, vec![0.7; 4800]);
        assert_relative_eq!(output[4799], 0.7, epsilon = 1e-4);
    }

    #[test]
    fn test_high_pass_blocks_dc() {
        let mut filter = Filter::high_pass(1000.0);
        let output = run(&mut filter, vec![0.7; 4800]);
        assert!(output[4799].abs() < 1e-4);
        // The first sample passes almost untouched
        assert!(output[0] > 0.0);
    }

    #[test]
    fn test_band_pass_blocks_dc() {
        let mut filter = Filter::new(FilterParams {
            kind: FilterKind::BandPass,
            frequency: 1000.0,
            dry_mix: 0.0,
        });
        let output = run(&mut filter, vec![0.5; 9600]);
        assert!(output[9599].abs() < 1e-4);
    }

    #[test]
    fn test_dry_mix_bypass() {
        let mut filter = Filter::new(FilterParams {
            kind: FilterKind::HighPass,
            frequency: 200.0,
            dry_mix: 1.0,
        });
        let input = vec![0.1, -0.3, 0.5, 0.9];
        assert_eq!(run(&mut filter, input.clone()), input);
    }

    #[test]
    fn test_channels_independent() {
        let mut states = vec![Filter::low_pass(1000.0), Filter::low_pass(1000.0)];
        let mut buffer = Buffer::from_interleaved(vec![1.0, 0.0, 1.0, 0.0], 2, 48000).unwrap();
        Filter::process(&mut buffer, &mut states).unwrap();
        assert!(buffer.get(1, 0).unwrap() > 0.0);
        assert_eq!(buffer.get(1, 1), Some(0.0));
    }

    #[test]
    fn test_validate() {
        assert!(FilterParams::default().validate().is_ok());
        let params = FilterParams {
            dry_mix: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
        let params = FilterParams {
            frequency: f32::NAN,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
