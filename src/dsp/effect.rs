//! Effect trait definition
//!
//! Every effect is a per-channel state record. Processing takes a buffer and a
//! slice of states index-aligned with the buffer's channels, and mutates the
//! buffer in place.

use crate::engine::Buffer;
use crate::error::{DspError, Result};
use serde::{Deserialize, Serialize};

/// Effect-type discriminant carried by every chain node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum DspKind {
    None = 0,
    Rms,
    Filter,
    LookaheadLimiter,
    Compressor,
    Delay,
    Reverb,
    Sampler,
    Gate,
    CubicLimiter,
}

impl DspKind {
    /// Every kind that can appear in a chain
    pub const ALL: [DspKind; 9] = [
        DspKind::Rms,
        DspKind::Filter,
        DspKind::LookaheadLimiter,
        DspKind::Compressor,
        DspKind::Delay,
        DspKind::Reverb,
        DspKind::Sampler,
        DspKind::Gate,
        DspKind::CubicLimiter,
    ];

    /// Get the kind identifier used in configs and listings
    pub fn as_str(&self) -> &'static str {
        match self {
            DspKind::None => "none",
            DspKind::Rms => "rms",
            DspKind::Filter => "filter",
            DspKind::LookaheadLimiter => "lookahead_limiter",
            DspKind::Compressor => "compressor",
            DspKind::Delay => "delay",
            DspKind::Reverb => "reverb",
            DspKind::Sampler => "sampler",
            DspKind::Gate => "gate",
            DspKind::CubicLimiter => "cubic_limiter",
        }
    }

    /// Numeric tag value
    pub fn tag(&self) -> u32 {
        *self as u32
    }

    /// Size in bytes of one per-channel state record of this kind
    pub fn state_size(&self) -> usize {
        use super::*;
        match self {
            DspKind::None | DspKind::CubicLimiter => 0,
            DspKind::Rms => std::mem::size_of::<Rms>(),
            DspKind::Filter => std::mem::size_of::<Filter>(),
            DspKind::LookaheadLimiter => std::mem::size_of::<LookaheadLimiter>(),
            DspKind::Compressor => std::mem::size_of::<Compressor>(),
            DspKind::Delay => std::mem::size_of::<Delay>(),
            DspKind::Reverb => std::mem::size_of::<Reverb>(),
            DspKind::Sampler => std::mem::size_of::<Sampler>(),
            DspKind::Gate => std::mem::size_of::<Gate>(),
        }
    }
}

impl std::fmt::Display for DspKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base trait for all stateful effects
///
/// `process` validates its inputs before touching any sample: on error the
/// buffer is left unmodified.
pub trait Effect: Sized {
    /// Discriminant used by the chain dispatcher
    const KIND: DspKind;

    /// Process `buffer` in place with one state per channel
    fn process(buffer: &mut Buffer<'_>, states: &mut [Self]) -> Result<()>;

    /// Clear history (rings, filter memory, delay contents) keeping parameters
    fn reset(&mut self);
}

/// Validate a buffer and its per-channel state slice
///
/// Missing state is reported before any buffer geometry problem.
pub(crate) fn check_inputs<T>(buffer: &Buffer<'_>, states: &[T]) -> Result<()> {
    if states.is_empty() {
        return Err(DspError::NullPointer);
    }
    buffer.validate()?;
    if states.len() < buffer.channels() {
        return Err(DspError::NullPointer);
    }
    Ok(())
}
