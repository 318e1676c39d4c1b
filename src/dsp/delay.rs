//! Delay Effect
//!
//! Feedback delay with wet/dry mix over a growable circular buffer. An
//! optional chain of effects processes the wet tap only.
//!
//! The buffer's capacity only ever grows. Shrinking the delay time shortens
//! the logical length and keeps the storage (and its contents); growing back
//! within capacity reuses it without reallocating. Growth allocates a new
//! buffer, copies the live contents and swaps it in only on success, so an
//! allocation failure leaves the previous buffer fully operative.
//!
//! Growth is a latency hazard on the real-time thread: call
//! [`Delay::reserve`] during setup with the largest delay time you expect.

use super::chain::Chain;
use super::effect::{check_inputs, DspKind, Effect};
use crate::engine::{db_to_amp, ms_to_samples, Buffer};
use crate::error::{DspError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Capacity is always rounded up to a multiple of this many samples
const GROWTH_STEP: usize = 1024;

/// Next capacity able to hold `required` samples
///
/// Grows by at least half the current capacity so repeated small increases
/// stay amortised. `None` when the rounded capacity does not fit in `usize`.
pub(crate) fn grow_capacity(current: usize, required: usize, step: usize) -> Option<usize> {
    let target = required.max(current.checked_add(current / 2)?);
    target.div_ceil(step).checked_mul(step)
}

// ============================================================================
// Delay Line
// ============================================================================

/// Growable circular buffer with a logical length
#[derive(Debug, Clone, Default)]
pub struct DelayLine {
    buffer: Vec<f32>,
    /// Current logical length; never exceeds `buffer.len()`
    delay_samples: usize,
    /// Write position, always below `delay_samples`
    index: usize,
}

impl DelayLine {
    /// Create an empty line; storage is allocated on first resize
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocated storage in samples
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Current logical length in samples
    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    /// Current write position
    pub fn index(&self) -> usize {
        self.index
    }

    /// Set the logical length, growing storage only when it exceeds capacity
    ///
    /// Lengths below one sample are treated as one sample.
    pub fn resize(&mut self, delay_samples: usize) -> Result<()> {
        let delay_samples = delay_samples.max(1);
        if self.delay_samples >= delay_samples {
            if self.index >= delay_samples {
                self.index = 0;
            }
            self.delay_samples = delay_samples;
            return Ok(());
        }
        if self.capacity() >= delay_samples {
            self.delay_samples = delay_samples;
            return Ok(());
        }

        let capacity = self.next_capacity(delay_samples)?;
        self.grow_to(capacity, self.delay_samples)?;
        self.delay_samples = delay_samples;
        Ok(())
    }

    /// Grow capacity to at least `samples` without touching the logical length
    pub fn reserve(&mut self, samples: usize) -> Result<()> {
        if self.capacity() >= samples {
            return Ok(());
        }
        let capacity = self.next_capacity(samples)?;
        self.grow_to(capacity, self.capacity())
    }

    fn next_capacity(&self, required: usize) -> Result<usize> {
        grow_capacity(self.capacity(), required, GROWTH_STEP).ok_or_else(|| {
            warn!(
                "Delay buffer of {} samples cannot be addressed, keeping {} samples",
                required,
                self.capacity()
            );
            DspError::AllocationFailure {
                requested: required,
            }
        })
    }

    /// Allocate `capacity` samples, keep the first `keep`, zero the rest
    fn grow_to(&mut self, capacity: usize, keep: usize) -> Result<()> {
        let mut grown = Vec::new();
        if grown.try_reserve_exact(capacity).is_err() {
            warn!(
                "Delay buffer growth to {} samples failed, keeping {} samples",
                capacity,
                self.capacity()
            );
            return Err(DspError::AllocationFailure {
                requested: capacity,
            });
        }
        grown.extend_from_slice(&self.buffer[..keep]);
        grown.resize(capacity, 0.0);
        debug!(
            "Delay buffer grown from {} to {} samples",
            self.capacity(),
            capacity
        );
        self.buffer = grown;
        Ok(())
    }

    /// Write `input + buffered * feedback`, advance, and return the new head
    #[inline]
    fn tick(&mut self, input: f32, feedback: f32) -> f32 {
        let slot = &mut self.buffer[self.index];
        *slot = input + *slot * feedback;
        self.index += 1;
        if self.index >= self.delay_samples {
            self.index = 0;
        }
        self.buffer[self.index]
    }

    /// Zero the stored samples and rewind the write position
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
    }
}

// ============================================================================
// Delay Effect
// ============================================================================

/// Delay parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayParams {
    /// Wet gain in dB
    pub gain: f32,
    /// Dry gain in dB
    pub gain_dry: f32,
    /// Delay time in ms
    pub delay: f32,
    /// Multiple of the buffered signal fed back into the line (0 to 1)
    pub feedback: f32,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            gain: 0.0,
            gain_dry: 0.0,
            delay: 100.0,
            feedback: 0.0,
        }
    }
}

impl DelayParams {
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
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(DspError::invalid_param("delay", self.delay, ">= 0 ms"));
        }
        if !self.feedback.is_finite() {
            return Err(DspError::invalid_param(
                "feedback",
                self.feedback,
                "finite value, typically 0 to 1",
            ));
        }
        Ok(())
    }
}

/// Per-channel delay state
#[derive(Debug, Clone, Default)]
pub struct Delay {
    pub params: DelayParams,
    line: DelayLine,
    /// Effects applied to the wet tap only (single channel)
    pub wet_effects: Chain,
}

impl Delay {
    /// Create a delay; storage is allocated on first use or by [`Delay::reserve`]
    pub fn new(params: DelayParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Create a delay whose wet tap runs through `wet_effects`
    pub fn with_wet_effects(params: DelayParams, wet_effects: Chain) -> Self {
        Self {
            params,
            wet_effects,
            ..Default::default()
        }
    }

    /// Size the line for the configured delay time at `samplerate`
    pub fn prepare(&mut self, samplerate: u32) -> Result<()> {
        self.line.resize(ms_to_samples(self.params.delay, samplerate))
    }

    /// Pre-size storage for delay times up to `max_delay_ms`
    ///
    /// Call this off the real-time thread; later processing within this size
    /// never allocates.
    pub fn reserve(&mut self, max_delay_ms: f32, samplerate: u32) -> Result<()> {
        self.line.reserve(ms_to_samples(max_delay_ms, samplerate).max(1))
    }

    /// The underlying circular buffer
    pub fn line(&self) -> &DelayLine {
        &self.line
    }
}

impl Effect for Delay {
    const KIND: DspKind = DspKind::Delay;

    fn process(buffer: &mut Buffer<'_>, states: &mut [Self]) -> Result<()> {
        check_inputs(buffer, states)?;
        let channels = buffer.channels();
        let samplerate = buffer.samplerate();

        // Every resize happens before any sample is written
        for state in states.iter_mut().take(channels) {
            state.wet_effects.check_channels(1)?;
            state.prepare(samplerate)?;
        }

        let frames = buffer.frames();
        let stride = buffer.stride();
        let samples = buffer.samples_mut();

        for (c, state) in states.iter_mut().enumerate().take(channels) {
            let amount = db_to_amp(state.params.gain);
            let amount_dry = db_to_amp(state.params.gain_dry);
            let feedback = state.params.feedback;

            for i in 0..frames {
                let s = i * stride + c;
                let dry = samples[s];
                let mut wet = state.line.tick(dry, feedback);
                state
                    .wet_effects
                    .process(&mut Buffer::one_sample(&mut wet, samplerate))?;
                samples[s] = wet * amount + dry * amount_dry;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.line.clear();
        self.wet_effects.reset();
    }
}
