//! AzAudio DSP - Real-time audio effects engine
//!
//! Block-based effects that process interleaved (or strided) `f32` buffers in
//! place, one state record per channel:
//! - Analysis: RMS tracker
//! - Filtering: one-pole low/high/band pass
//! - Dynamics: cubic soft clip, lookahead limiter, compressor, gate
//! - Time-based: feedback delay, fifteen-tap reverb
//! - Sources: looping sampler with smoothed speed and gain
//!
//! # Architecture
//!
//! - [`engine`]: buffer views, unit conversions and test signals
//! - [`dsp`]: the effects, the [`dsp::Effect`] trait and [`dsp::Chain`] dispatch
//! - [`config`]: JSON rack descriptions that build chains
//!
//! Processing is single-threaded and never blocks. The only operation that may
//! allocate after setup is delay growth; reserve delay capacity up front to keep
//! it off the audio thread.

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;

pub use error::{DspError, Result};
