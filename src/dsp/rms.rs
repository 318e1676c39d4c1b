//! RMS envelope tracker
//!
//! Running root-mean-square over the last [`RMS_SAMPLES`] samples of each
//! channel. Used standalone and as the detector inside the compressor and
//! gate.

use super::effect::{check_inputs, DspKind, Effect};
use super::ring::RingBuffer;
use crate::engine::Buffer;
use crate::error::Result;

/// Length of the trailing window
pub const RMS_SAMPLES: usize = 128;

/// Per-channel RMS state: circular history of squared samples
#[derive(Debug, Clone, Default)]
pub struct Rms {
    squared: RingBuffer<RMS_SAMPLES>,
}

impl Rms {
    /// Create a zeroed tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Current RMS level over the window
    pub fn level(&self) -> f32 {
        self.squared.mean().sqrt()
    }

    /// Running sum of squared samples
    pub fn sum(&self) -> f32 {
        self.squared.sum()
    }

    /// Squared samples in the current window
    pub fn history(&self) -> &RingBuffer<RMS_SAMPLES> {
        &self.squared
    }
}

impl Effect for Rms {
    const KIND: DspKind = DspKind::Rms;

    fn process(buffer: &mut Buffer<'_>, states: &mut [Self]) -> Result<()> {
        check_inputs(buffer, states)?;
        let frames = buffer.frames();
        let channels = buffer.channels();
        let stride = buffer.stride();
        let samples = buffer.samples_mut();

        for (c, state) in states.iter_mut().enumerate().take(channels) {
            for i in 0..frames {
                let s = i * stride + c;
                state.squared.push(samples[s] * samples[s]);
                samples[s] = state.level();
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.squared.reset();
    }
}
