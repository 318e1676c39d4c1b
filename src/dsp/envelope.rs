//! Attack/decay level detector shared by the compressor and the gate

use super::effect::Effect;
use super::rms::Rms;
use crate::engine::{amp_to_db, Buffer};
use crate::error::Result;

/// Lowest level the detector reports, in dB
pub const DETECTOR_FLOOR_DB: f32 = -120.0;

/// One-pole smoothing coefficient for a time constant in milliseconds
#[inline]
pub(crate) fn time_to_coeff(time_ms: f32, samplerate: u32) -> f32 {
    let t = samplerate as f32 / 1000.0;
    (-1.0 / (time_ms * t)).exp()
}

/// RMS detector followed by an attack/decay smoother in the dB domain
#[derive(Debug, Clone, Default)]
pub struct EnvelopeDetector {
    rms: Rms,
    /// Smoothed detector level in dB
    attenuation: f32,
}

impl EnvelopeDetector {
    /// Create a detector at 0 dB with an empty RMS window
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample and return the smoothed level in dB
    ///
    /// `attack` applies while the level rises above the previous smoothed
    /// value, `decay` while it falls.
    pub fn detect(&mut self, sample: f32, samplerate: u32, attack: f32, decay: f32) -> Result<f32> {
        let mut rms = sample;
        Rms::process(
            &mut Buffer::one_sample(&mut rms, samplerate),
            std::slice::from_mut(&mut self.rms),
        )?;

        let mut level = amp_to_db(rms);
        if level < DETECTOR_FLOOR_DB {
            level = DETECTOR_FLOOR_DB;
        }
        let factor = if level > self.attenuation { attack } else { decay };
        self.attenuation = level + factor * (self.attenuation - level);
        Ok(self.attenuation)
    }

    /// Smoothed detector level in dB
    pub fn attenuation(&self) -> f32 {
        self.attenuation
    }

    /// Forget the tracked level and the RMS window
    pub fn reset(&mut self) {
        self.rms.reset();
        self.attenuation = 0.0;
    }
}
