//! Sampler
//!
//! Loops a shared source buffer at a variable speed. Speed and gain glide
//! towards their targets over roughly [`SAMPLER_TRANSITION_FRAMES`] frames so
//! parameter changes never click. Playback at or below the source rate uses
//! cubic interpolation; faster playback averages every source sample the
//! read head skips over, up to one full loop of the source.

use super::effect::{check_inputs, DspKind, Effect};
use crate::engine::{db_to_amp, Buffer};
use crate::error::{DspError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Time constant of the speed and gain glides, in frames
pub const SAMPLER_TRANSITION_FRAMES: f32 = 128.0;

/// Cubic interpolation between `b` and `c` at `x` in `[0, 1)`
#[inline]
pub fn cubic(a: f32, b: f32, c: f32, d: f32, x: f32) -> f32 {
    b + 0.5
        * x
        * (c - a + x * (2.0 * a - 5.0 * b + 4.0 * c - d + x * (3.0 * (b - c) + d - a)))
}

/// Sampler parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerParams {
    /// Playback speed (1 plays the source at its own samplerate)
    pub speed: f32,
    /// Volume in dB
    pub gain: f32,
    /// Source channel to read; clamped to the source's last channel
    pub channel: usize,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            speed: 1.0,
            gain: 0.0,
            channel: 0,
        }
    }
}

impl SamplerParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !self.speed.is_finite() {
            return Err(DspError::invalid_param("speed", self.speed, "finite value"));
        }
        if !self.gain.is_finite() {
            return Err(DspError::invalid_param("gain", self.gain, "finite dB value"));
        }
        Ok(())
    }
}

/// Per-channel sampler state
///
/// The source is shared between states (typically one per output channel)
/// and never modified.
#[derive(Debug, Clone)]
pub struct Sampler {
    pub params: SamplerParams,
    source: Arc<Buffer<'static>>,
    /// Fractional read position in source frames
    frame: f32,
    /// Smoothed speed
    s: f32,
    /// Smoothed gain in dB
    g: f32,
}

impl Sampler {
    /// Start playback at the beginning of `source`
    pub fn new(params: SamplerParams, source: Arc<Buffer<'static>>) -> Self {
        Self {
            s: params.speed,
            g: 0.0,
            frame: 0.0,
            params,
            source,
        }
    }

    /// Shared source buffer
    pub fn source(&self) -> &Arc<Buffer<'static>> {
        &self.source
    }

    /// Current read position in source frames
    pub fn frame(&self) -> f32 {
        self.frame
    }

    /// Smoothed playback speed
    pub fn speed(&self) -> f32 {
        self.s
    }

    /// Read source frame `index`, wrapping in both directions
    #[inline]
    fn read(&self, index: isize, channel: usize) -> f32 {
        let frames = self.source.frames() as isize;
        let i = index.rem_euclid(frames) as usize;
        self.source.samples()[self.source.index(i, channel)]
    }

    #[inline]
    fn tick(&mut self, transition: f32, samplerate_factor: f32) -> f32 {
        self.s = self.params.speed + transition * (self.s - self.params.speed);
        self.g = self.params.gain + transition * (self.g - self.params.gain);

        let speed = self.s * samplerate_factor;
        let volume = db_to_amp(self.g);
        let channel = self.params.channel.min(self.source.channels() - 1);

        let whole = self.frame.floor();
        let fraction = self.frame - whole;
        let base = whole as isize;

        let sample = if speed <= 1.0 {
            cubic(
                self.read(base - 1, channel),
                self.read(base, channel),
                self.read(base + 1, channel),
                self.read(base + 2, channel),
                fraction,
            )
        } else {
            // Past one full loop the average stops changing
            let width = (speed as isize).min(self.source.frames() as isize);
            let mut total = self.read(base, channel) * (1.0 - fraction);
            for i in 1..width {
                total += self.read(base + i, channel);
            }
            total += self.read(base + width, channel) * fraction;
            total / width as f32
        };

        self.frame = (self.frame + self.s).rem_euclid(self.source.frames() as f32);
        sample * volume
    }
}

impl Effect for Sampler {
    const KIND: DspKind = DspKind::Sampler;

    fn process(buffer: &mut Buffer<'_>, states: &mut [Self]) -> Result<()> {
        check_inputs(buffer, states)?;
        let channels = buffer.channels();
        for state in states.iter().take(channels) {
            state.source.validate()?;
        }

        let frames = buffer.frames();
        let stride = buffer.stride();
        let samplerate = buffer.samplerate();
        let samples = buffer.samples_mut();
        let transition = (-1.0 / SAMPLER_TRANSITION_FRAMES).exp();

        for (c, state) in states.iter_mut().enumerate().take(channels) {
            let samplerate_factor = samplerate as f32 / state.source.samplerate() as f32;
            for i in 0..frames {
                samples[i * stride + c] = state.tick(transition, samplerate_factor);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.frame = 0.0;
        self.s = self.params.speed;
        self.g = 0.0;
    }
}
