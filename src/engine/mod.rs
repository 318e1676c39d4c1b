//! Audio Engine Module
//!
//! Buffer views shared by every effect, plus unit conversions and
//! deterministic test-signal generation.

pub mod buffer;
pub mod signal;

pub use buffer::{amp_to_db, db_to_amp, ms_to_samples, samples_to_ms, Buffer};
pub use signal::{generate_signal, SignalKind};
