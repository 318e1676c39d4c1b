//! DSP Effects Library
//!
//! Per-channel effect states that process a [`Buffer`](crate::engine::Buffer)
//! in place. Every stateful effect implements [`Effect`]; a [`Chain`] runs a
//! heterogeneous, ordered list of them.

mod chain;
mod compressor;
mod delay;
mod effect;
mod envelope;
mod filter;
mod gate;
mod limiter;
mod reverb;
mod ring;
mod rms;
mod sampler;

pub use chain::{Chain, Node};
pub use compressor::{Compressor, CompressorParams};
pub use delay::{Delay, DelayLine, DelayParams};
pub use effect::{DspKind, Effect};
pub use envelope::{EnvelopeDetector, DETECTOR_FLOOR_DB};
pub use filter::{Filter, FilterKind, FilterParams};
pub use gate::{Gate, GateParams};
pub use limiter::{cubic_limiter, LookaheadLimiter, LookaheadLimiterParams, LOOKAHEAD_SAMPLES};
pub use reverb::{Reverb, ReverbParams, REVERB_DELAY_COUNT, STEREO_SPREAD_SAMPLES};
pub use ring::{RingBuffer, SampleHistory};
pub use rms::{Rms, RMS_SAMPLES};
pub use sampler::{cubic, Sampler, SamplerParams, SAMPLER_TRANSITION_FRAMES};
