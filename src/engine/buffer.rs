//! Audio Buffer Views
//!
//! A [`Buffer`] is a view over interleaved (or strided) sample storage plus
//! the geometry needed to address it. Storage is owned only when the buffer
//! was allocated through [`Buffer::new`]; every other constructor borrows
//! memory owned by the caller.

use crate::error::{DspError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_amp(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns `-inf` for zero input, matching `20 * log10(0)`.
#[inline]
pub fn amp_to_db(amp: f32) -> f32 {
    20.0 * amp.log10()
}

/// Convert a duration in milliseconds to a whole number of samples (truncating)
#[inline]
pub fn ms_to_samples(ms: f32, samplerate: u32) -> usize {
    let samples = ms * samplerate as f32 / 1000.0;
    if samples > 0.0 {
        samples as usize
    } else {
        0
    }
}

/// Convert a sample count to milliseconds
#[inline]
pub fn samples_to_ms(samples: usize, samplerate: u32) -> f32 {
    samples as f32 * 1000.0 / samplerate as f32
}

// ============================================================================
// Buffer
// ============================================================================

#[derive(Debug)]
enum Storage<'a> {
    Owned(Vec<f32>),
    Borrowed(&'a mut [f32]),
    Released,
}

/// Strided view over audio samples
///
/// One frame is a single sample from each channel. Sample `(frame, channel)`
/// lives at `frame * stride + channel`.
#[derive(Debug)]
pub struct Buffer<'a> {
    storage: Storage<'a>,
    /// How many samples there are in a single channel
    frames: usize,
    /// Distance between consecutive frames of one channel, in samples
    stride: usize,
    /// How many channels DSP functions should access
    channels: usize,
    /// Samples per second
    samplerate: u32,
}

impl Buffer<'static> {
    /// Allocate zeroed interleaved storage for `frames × channels` samples
    pub fn new(frames: usize, channels: usize, samplerate: u32) -> Result<Self> {
        if frames < 1 {
            return Err(DspError::InvalidFrameCount { frames });
        }
        if channels < 1 {
            return Err(DspError::InvalidChannelCount { channels });
        }
        let len = frames
            .checked_mul(channels)
            .ok_or(DspError::AllocationFailure {
                requested: usize::MAX,
            })?;
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(len)
            .map_err(|_| DspError::AllocationFailure { requested: len })?;
        samples.resize(len, 0.0);

        Ok(Self {
            storage: Storage::Owned(samples),
            frames,
            stride: channels,
            channels,
            samplerate,
        })
    }

    /// Take ownership of existing interleaved samples
    pub fn from_interleaved(samples: Vec<f32>, channels: usize, samplerate: u32) -> Result<Self> {
        if channels < 1 {
            return Err(DspError::InvalidChannelCount { channels });
        }
        let frames = samples.len() / channels;
        if frames < 1 || samples.len() % channels != 0 {
            return Err(DspError::InvalidFrameCount { frames });
        }
        Ok(Self {
            storage: Storage::Owned(samples),
            frames,
            stride: channels,
            channels,
            samplerate,
        })
    }
}

impl<'a> Buffer<'a> {
    /// Borrow caller-owned interleaved samples
    pub fn from_slice(samples: &'a mut [f32], channels: usize, samplerate: u32) -> Result<Self> {
        if channels < 1 {
            return Err(DspError::InvalidChannelCount { channels });
        }
        let frames = samples.len() / channels;
        Self::from_slice_strided(samples, frames, channels, channels, samplerate)
    }

    /// Borrow caller-owned samples with an explicit stride
    ///
    /// `stride` may exceed `channels` to address a subset of the channels of a
    /// wider interleaved block.
    pub fn from_slice_strided(
        samples: &'a mut [f32],
        frames: usize,
        channels: usize,
        stride: usize,
        samplerate: u32,
    ) -> Result<Self> {
        if channels < 1 || stride < channels {
            return Err(DspError::InvalidChannelCount { channels });
        }
        if frames < 1 {
            return Err(DspError::InvalidFrameCount { frames });
        }
        let required = (frames - 1) * stride + channels;
        if samples.len() < required {
            return Err(DspError::InvalidFrameCount { frames });
        }
        Ok(Self {
            storage: Storage::Borrowed(samples),
            frames,
            stride,
            channels,
            samplerate,
        })
    }

    /// Single-sample, single-channel view over one externally owned sample
    ///
    /// Composite effects use this to push one sample at a time through
    /// another effect without allocating.
    pub fn one_sample(sample: &'a mut f32, samplerate: u32) -> Self {
        Self {
            storage: Storage::Borrowed(std::slice::from_mut(sample)),
            frames: 1,
            stride: 1,
            channels: 1,
            samplerate,
        }
    }

    /// Release owned storage
    ///
    /// Fails with `NullPointer` if the buffer never owned storage or was
    /// already released.
    pub fn release(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.storage, Storage::Released) {
            Storage::Owned(_) => Ok(()),
            other => {
                self.storage = other;
                Err(DspError::NullPointer)
            }
        }
    }

    /// Check the processing preconditions, reporting the first violation
    pub fn validate(&self) -> Result<()> {
        if matches!(self.storage, Storage::Released) {
            return Err(DspError::NullPointer);
        }
        if self.channels < 1 {
            return Err(DspError::InvalidChannelCount {
                channels: self.channels,
            });
        }
        if self.frames < 1 {
            return Err(DspError::InvalidFrameCount {
                frames: self.frames,
            });
        }
        Ok(())
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Distance between frames of one channel
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Sample rate in Hz
    pub fn samplerate(&self) -> u32 {
        self.samplerate
    }

    /// Whether this buffer owns its storage
    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    /// Raw storage (empty once released)
    pub fn samples(&self) -> &[f32] {
        match &self.storage {
            Storage::Owned(samples) => samples,
            Storage::Borrowed(samples) => samples,
            Storage::Released => &[],
        }
    }

    /// Mutable raw storage (empty once released)
    pub fn samples_mut(&mut self) -> &mut [f32] {
        match &mut self.storage {
            Storage::Owned(samples) => samples,
            Storage::Borrowed(samples) => samples,
            Storage::Released => &mut [],
        }
    }

    /// Storage index of `(frame, channel)`
    #[inline]
    pub fn index(&self, frame: usize, channel: usize) -> usize {
        frame * self.stride + channel
    }

    /// Get a sample at the given frame and channel
    pub fn get(&self, frame: usize, channel: usize) -> Option<f32> {
        if frame < self.frames && channel < self.channels {
            self.samples().get(self.index(frame, channel)).copied()
        } else {
            None
        }
    }

    /// Set a sample at the given frame and channel
    pub fn set(&mut self, frame: usize, channel: usize, value: f32) {
        if frame < self.frames && channel < self.channels {
            let i = self.index(frame, channel);
            if let Some(sample) = self.samples_mut().get_mut(i) {
                *sample = value;
            }
        }
    }

    /// Mix `src` into this buffer: `dst = dst * volume_dst + src * volume_src`
    ///
    /// Covers the frames and channels both buffers have in common.
    pub fn mix(&mut self, volume_dst: f32, src: &Buffer<'_>, volume_src: f32) -> Result<()> {
        self.validate()?;
        src.validate()?;
        let frames = self.frames.min(src.frames);
        let channels = self.channels.min(src.channels);
        for i in 0..frames {
            for c in 0..channels {
                let s = src.samples()[src.index(i, c)];
                let d = self.index(i, c);
                let dst = &mut self.samples_mut()[d];
                *dst = *dst * volume_dst + s * volume_src;
            }
        }
        Ok(())
    }

    /// Copy one channel of `src` into one channel of this buffer
    pub fn copy_channel(
        &mut self,
        channel_dst: usize,
        src: &Buffer<'_>,
        channel_src: usize,
    ) -> Result<()> {
        self.validate()?;
        src.validate()?;
        if channel_dst >= self.channels {
            return Err(DspError::InvalidChannelCount {
                channels: channel_dst,
            });
        }
        if channel_src >= src.channels {
            return Err(DspError::InvalidChannelCount {
                channels: channel_src,
            });
        }
        for i in 0..self.frames.min(src.frames) {
            let s = src.samples()[src.index(i, channel_src)];
            let d = self.index(i, channel_dst);
            self.samples_mut()[d] = s;
        }
        Ok(())
    }

    /// Peak level of one channel in dBFS
    pub fn peak_db(&self, channel: usize) -> f32 {
        let peak = (0..self.frames)
            .filter_map(|i| self.get(i, channel))
            .map(f32::abs)
            .fold(0.0_f32, f32::max);
        amp_to_db(peak)
    }

    /// RMS level of one channel in dBFS
    pub fn rms_db(&self, channel: usize) -> f32 {
        if channel >= self.channels || self.frames == 0 {
            return f32::NEG_INFINITY;
        }
        let sum_sq: f64 = (0..self.frames)
            .filter_map(|i| self.get(i, channel))
            .map(|s| (s as f64) * (s as f64))
            .sum();
        amp_to_db((sum_sq / self.frames as f64).sqrt() as f32)
    }
}
