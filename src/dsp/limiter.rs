//! Limiters
//!
//! - [`cubic_limiter`]: stateless soft clip, `1.5x - 0.5x³` over `[-1, 1]`.
//! - [`LookaheadLimiter`]: delay-compensated peak limiter. Adds exactly
//!   [`LOOKAHEAD_SAMPLES`] samples of latency in exchange for never
//!   overshooting the output ceiling.

use super::effect::{check_inputs, DspKind, Effect};
use super::ring::{RingBuffer, SampleHistory};
use crate::engine::{amp_to_db, db_to_amp, Buffer};
use crate::error::{DspError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Lookahead window and added latency, in samples
pub const LOOKAHEAD_SAMPLES: usize = 128;

// ============================================================================
// Cubic Limiter
// ============================================================================

#[inline]
fn cubic_limit_sample(sample: f32) -> f32 {
    let x = sample.clamp(-1.0, 1.0);
    1.5 * x - 0.5 * x * x * x
}

/// Soft-clip every sample of every channel in place
pub fn cubic_limiter(buffer: &mut Buffer<'_>) -> Result<()> {
    buffer.validate()?;
    let frames = buffer.frames();
    let channels = buffer.channels();
    let stride = buffer.stride();
    let samples = buffer.samples_mut();

    if stride == channels {
        for sample in samples.iter_mut().take(frames * channels) {
            *sample = cubic_limit_sample(*sample);
        }
    } else {
        for c in 0..channels {
            for i in 0..frames {
                let s = i * stride + c;
                samples[s] = cubic_limit_sample(samples[s]);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Lookahead Limiter
// ============================================================================

/// Lookahead limiter parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LookaheadLimiterParams {
    /// Input gain in dB
    pub gain_input: f32,
    /// Output gain in dB; output never peaks above this level
    pub gain_output: f32,
}

impl LookaheadLimiterParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !self.gain_input.is_finite() {
            return Err(DspError::invalid_param(
                "gain_input",
                self.gain_input,
                "finite dB value",
            ));
        }
        if !self.gain_output.is_finite() {
            return Err(DspError::invalid_param(
                "gain_output",
                self.gain_output,
                "finite dB value",
            ));
        }
        Ok(())
    }
}

/// Per-channel lookahead limiter state
///
/// Two parallel histories: peak estimates in dB above full scale, and the raw
/// samples waiting to be emitted.
#[derive(Debug, Clone, Default)]
pub struct LookaheadLimiter {
    pub params: LookaheadLimiterParams,
    peaks: RingBuffer<LOOKAHEAD_SAMPLES>,
    values: SampleHistory<LOOKAHEAD_SAMPLES>,
}

impl LookaheadLimiter {
    /// Create a limiter with the given parameters
    pub fn new(params: LookaheadLimiterParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Added output latency in samples
    pub const fn latency() -> usize {
        LOOKAHEAD_SAMPLES
    }

    #[inline]
    fn tick(&mut self, sample: f32, amount_output: f32) -> f32 {
        let mut gain = self.params.gain_input;
        let mut peak = amp_to_db(sample.abs()) + gain;
        if peak < 0.0 {
            peak = 0.0;
        }

        // Average including the new estimate, before it is stored
        let average = (self.peaks.sum() + (peak - self.peaks.oldest())) / LOOKAHEAD_SAMPLES as f32;
        if average > peak {
            peak = average;
        }
        self.peaks.push(peak);
        let delayed = self.values.push(sample);

        let head = self.peaks.oldest();
        if average > head {
            gain -= average;
        } else {
            gain -= head;
        }

        let out = (delayed * db_to_amp(gain)).clamp(-1.0, 1.0);
        out * amount_output
    }
}

impl Effect for LookaheadLimiter {
    const KIND: DspKind = DspKind::LookaheadLimiter;

    fn process(buffer: &mut Buffer<'_>, states: &mut [Self]) -> Result<()> {
        check_inputs(buffer, states)?;
        let frames = buffer.frames();
        let channels = buffer.channels();
        let stride = buffer.stride();
        let samples = buffer.samples_mut();

        for (c, state) in states.iter_mut().enumerate().take(channels) {
            let amount_output = db_to_amp(state.params.gain_output);
            for i in 0..frames {
                let s = i * stride + c;
                samples[s] = state.tick(samples[s], amount_output);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.peaks.reset();
        self.values.reset();
    }
}
