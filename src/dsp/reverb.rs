//! Reverb Effect
//!
//! Fifteen low-pass + feedback delay taps. The first ten run in parallel on
//! the dry input (early reflections); the last five run in series on the
//! accumulated output (diffusion). Tap lengths are fixed offsets tuned at
//! 48 kHz, shifted by the pre-delay and a per-channel stereo offset.

use super::delay::{Delay, DelayParams};
use super::effect::{check_inputs, DspKind, Effect};
use super::filter::Filter;
use crate::engine::{db_to_amp, samples_to_ms, Buffer};
use crate::error::{DspError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Number of delay taps per channel
pub const REVERB_DELAY_COUNT: usize = 15;

/// Taps below this index form the early-reflection bank
const EARLY_TAPS: usize = REVERB_DELAY_COUNT * 2 / 3;

/// Samplerate the base tap lengths are expressed in
const TAP_REFERENCE_SAMPLERATE: u32 = 48000;

/// Base tap lengths in samples at 48 kHz
const TAP_SAMPLES: [usize; REVERB_DELAY_COUNT] = [
    1557, 1617, 1491, 1422, 1277, 1356, 1188, 1116, 2111, 2133, 673, 556, 441, 341, 713,
];

/// Default stereo offset between consecutive channels, in samples at 48 kHz
pub const STEREO_SPREAD_SAMPLES: usize = 37;

// ============================================================================
// Parameters
// ============================================================================

/// Reverb parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbParams {
    /// Wet gain in dB
    pub gain: f32,
    /// Dry gain in dB
    pub gain_dry: f32,
    /// Larger rooms feed back more; must be positive
    pub roomsize: f32,
    /// Brightness; scales the tap low-pass cutoffs (1 = 4 kHz early bank)
    pub color: f32,
    /// Pre-delay in ms added to every tap
    pub delay: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            gain: 0.0,
            gain_dry: 0.0,
            roomsize: 1.0,
            color: 1.0,
            delay: 0.0,
        }
    }
}

impl ReverbParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !self.gain.is_finite() {
            return Err(DspError::invalid_param("gain", self.gain, "finite dB value"));
        }
        if !self.gain_dry.is_finite() {
            return Err(DspError::invalid_param(
                "gain_dry",
                self.gain_dry,
                "finite dB value",
            ));
        }
        if !self.roomsize.is_finite() || self.roomsize <= 0.0 {
            return Err(DspError::invalid_param("roomsize", self.roomsize, "> 0"));
        }
        if !self.color.is_finite() || self.color < 0.0 {
            return Err(DspError::invalid_param("color", self.color, ">= 0"));
        }
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(DspError::invalid_param("delay", self.delay, ">= 0 ms"));
        }
        Ok(())
    }

    /// Feedback shared by the early-reflection taps
    pub fn early_feedback(&self) -> f32 {
        0.985 - 0.2 / self.roomsize
    }
}

/// Feedback of a diffusion tap, rising with its index
#[inline]
fn diffusion_feedback(tap: usize) -> f32 {
    (tap as f32 + 8.0) / (REVERB_DELAY_COUNT as f32 + 8.0)
}

// ============================================================================
// Reverb
// ============================================================================

#[derive(Debug, Clone, Default)]
struct ReverbTap {
    delay: Delay,
    filter: Filter,
}

/// Per-channel reverb state
#[derive(Debug, Clone, Default)]
pub struct Reverb {
    pub params: ReverbParams,
    taps: [ReverbTap; REVERB_DELAY_COUNT],
    /// Extra length added to every tap, in samples at 48 kHz
    stereo_offset: usize,
}

impl Reverb {
    /// Create a reverb with the given parameters and no stereo offset
    pub fn new(params: ReverbParams) -> Self {
        Self::with_stereo_offset(params, 0)
    }

    /// Create a reverb whose taps are lengthened by `stereo_offset` samples
    pub fn with_stereo_offset(params: ReverbParams, stereo_offset: usize) -> Self {
        let mut reverb = Self {
            params,
            stereo_offset,
            ..Default::default()
        };
        reverb.configure_taps();
        reverb
    }

    /// One state per channel, decorrelated by [`STEREO_SPREAD_SAMPLES`]
    pub fn per_channel(params: ReverbParams, channels: usize) -> Vec<Self> {
        (0..channels)
            .map(|c| Self::with_stereo_offset(params.clone(), c * STEREO_SPREAD_SAMPLES))
            .collect()
    }

    /// Extra samples added to every tap for this channel
    pub fn stereo_offset(&self) -> usize {
        self.stereo_offset
    }

    /// Push the current parameters down into every tap
    fn configure_taps(&mut self) {
        let feedback = self.params.early_feedback();
        let color = self.params.color * 4000.0;
        let pre_delay = self.params.delay;
        let offset = self.stereo_offset;

        for (tap, state) in self.taps.iter_mut().enumerate() {
            let (feedback, frequency) = if tap < EARLY_TAPS {
                (feedback, color)
            } else {
                (diffusion_feedback(tap), color * 4.0)
            };
            state.delay.params = DelayParams {
                gain: 0.0,
                gain_dry: 0.0,
                delay: samples_to_ms(TAP_SAMPLES[tap] + offset, TAP_REFERENCE_SAMPLERATE)
                    + pre_delay,
                feedback,
            };
            state.filter.params.frequency = frequency;
        }
    }

    /// Size every tap for the current parameters at `samplerate`
    pub fn prepare(&mut self, samplerate: u32) -> Result<()> {
        self.configure_taps();
        for tap in self.taps.iter_mut() {
            tap.delay.prepare(samplerate)?;
        }
        Ok(())
    }

    /// Sum of all tap lengths: silence this long flushes the network
    pub fn total_delay_samples(&self) -> usize {
        self.taps
            .iter()
            .map(|tap| tap.delay.line().delay_samples())
            .sum()
    }
}

impl Effect for Reverb {
    const KIND: DspKind = DspKind::Reverb;

    fn process(buffer: &mut Buffer<'_>, states: &mut [Self]) -> Result<()> {
        check_inputs(buffer, states)?;
        let channels = buffer.channels();
        let samplerate = buffer.samplerate();

        for state in states.iter_mut().take(channels) {
            state.prepare(samplerate)?;
        }

        let frames = buffer.frames();
        let stride = buffer.stride();
        let samples = buffer.samples_mut();
        let tap_count = REVERB_DELAY_COUNT as f32;

        for (c, state) in states.iter_mut().enumerate().take(channels) {
            let amount = db_to_amp(state.params.gain);
            let amount_dry = db_to_amp(state.params.gain_dry);

            for i in 0..frames {
                let s = i * stride + c;
                let dry = samples[s];
                let mut out = dry;

                for tap in state.taps[..EARLY_TAPS].iter_mut() {
                    let mut early = dry;
                    tap.process(&mut early, samplerate)?;
                    out += (early - dry) / tap_count;
                }
                for tap in state.taps[EARLY_TAPS..].iter_mut() {
                    let mut diffuse = out;
                    tap.process(&mut diffuse, samplerate)?;
                    out += (diffuse - out) / tap_count;
                }

                samples[s] = out * amount + dry * amount_dry;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        for tap in self.taps.iter_mut() {
            tap.delay.reset();
            tap.filter.reset();
        }
    }
}

impl ReverbTap {
    /// Low-pass then delay one sample in place
    #[inline]
    fn process(&mut self, sample: &mut f32, samplerate: u32) -> Result<()> {
        Filter::process(
            &mut Buffer::one_sample(sample, samplerate),
            std::slice::from_mut(&mut self.filter),
        )?;
        Delay::process(
            &mut Buffer::one_sample(sample, samplerate),
            std::slice::from_mut(&mut self.delay),
        )
    }
}
