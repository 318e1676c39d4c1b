//! Test signal generation
//!
//! Deterministic signals used by the CLI and the tests to drive effects.

use super::buffer::Buffer;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Shape of a generated test signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Sine wave at the requested frequency
    Sine,
    /// Single full-amplitude sample at frame 0, silence afterwards
    Impulse,
    /// Constant value equal to the amplitude
    Dc,
    /// All zeros
    Silence,
}

/// Generate an interleaved test signal with the same content on every channel
pub fn generate_signal(
    kind: SignalKind,
    frequency: f32,
    amplitude: f32,
    frames: usize,
    channels: usize,
    samplerate: u32,
) -> Result<Buffer<'static>> {
    let mut buffer = Buffer::new(frames, channels, samplerate)?;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / samplerate as f32;

    for i in 0..frames {
        let value = match kind {
            SignalKind::Sine => amplitude * (angular_freq * i as f32).sin(),
            SignalKind::Impulse if i == 0 => amplitude,
            SignalKind::Impulse => 0.0,
            SignalKind::Dc => amplitude,
            SignalKind::Silence => 0.0,
        };
        for c in 0..channels {
            buffer.set(i, c, value);
        }
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_rms() {
        let buf = generate_signal(SignalKind::Sine, 1000.0, 1.0, 48000, 1, 48000).unwrap();
        // RMS of a unit sine is -3.01 dB
        assert!((buf.rms_db(0) - (-3.01)).abs() < 0.05);
    }

    #[test]
    fn test_impulse() {
        let buf = generate_signal(SignalKind::Impulse, 0.0, 0.8, 4, 2, 48000).unwrap();
        assert_eq!(buf.samples(), &[0.8, 0.8, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_dc_and_silence() {
        let dc = generate_signal(SignalKind::Dc, 0.0, 0.5, 3, 1, 48000).unwrap();
        assert!(dc.samples().iter().all(|&s| s == 0.5));
        let silence = generate_signal(SignalKind::Silence, 440.0, 1.0, 3, 1, 48000).unwrap();
        assert!(silence.samples().iter().all(|&s| s == 0.0));
    }
}
