//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;

use log::info;

use crate::config::RackConfig;
use crate::dsp::{Chain, DspKind};
use crate::engine::{generate_signal, ms_to_samples, Buffer, SignalKind};
use crate::error::{DspError, Result};

/// Process interleaved `samples` through `chain` in blocks of `block_frames`
///
/// The last block may be shorter. Effect state carries across blocks, so the
/// result matches a single pass over the whole signal.
pub fn process_in_blocks(
    chain: &mut Chain,
    samples: &mut [f32],
    channels: usize,
    samplerate: u32,
    block_frames: usize,
) -> Result<()> {
    if block_frames < 1 {
        return Err(DspError::InvalidFrameCount {
            frames: block_frames,
        });
    }
    for block in samples.chunks_mut(block_frames * channels) {
        let mut buffer = Buffer::from_slice(block, channels, samplerate)?;
        chain.process(&mut buffer)?;
    }
    Ok(())
}

/// Render a generated signal through a rack and print input/output levels.
pub fn render(
    config: Option<&Path>,
    signal: SignalKind,
    frequency: f32,
    amplitude: f32,
    duration: f32,
) -> Result<()> {
    let rack = match config {
        Some(path) => RackConfig::load(path)?,
        None => RackConfig::default(),
    };
    let mut chain = rack.build()?;

    let frames = ms_to_samples(duration * 1000.0, rack.samplerate);
    info!(
        "Rendering {:?} for {} frames ({} channels @ {} Hz)",
        signal, frames, rack.channels, rack.samplerate
    );
    let input = generate_signal(
        signal,
        frequency,
        amplitude,
        frames,
        rack.channels,
        rack.samplerate,
    )?;

    let mut rendered = input.samples().to_vec();
    process_in_blocks(
        &mut chain,
        &mut rendered,
        rack.channels,
        rack.samplerate,
        rack.block_frames,
    )?;
    let output = Buffer::from_interleaved(rendered, rack.channels, rack.samplerate)?;

    let kinds: Vec<&str> = chain.iter().map(|node| node.kind().as_str()).collect();
    println!("=== AzAudio Render ===");
    println!(
        "Chain: {}",
        if kinds.is_empty() {
            "(empty)".to_string()
        } else {
            kinds.join(" -> ")
        }
    );
    println!(
        "Signal: {:?} {:.1} Hz, amplitude {:.3}, {} frames",
        signal, frequency, amplitude, frames
    );
    println!("{:-<60}", "");
    println!(
        "{:<8} {:>12} {:>12} {:>12} {:>12}",
        "channel", "in peak", "in rms", "out peak", "out rms"
    );
    for c in 0..rack.channels {
        println!(
            "{:<8} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
            c,
            input.peak_db(c),
            input.rms_db(c),
            output.peak_db(c),
            output.rms_db(c)
        );
    }
    println!("{:-<60}", "");

    Ok(())
}

/// List every node kind.
pub fn list_kinds() -> Result<()> {
    println!("{:>3}  {:<18} {:>12}", "tag", "kind", "state bytes");
    for kind in DspKind::ALL {
        println!("{:>3}  {:<18} {:>12}", kind.tag(), kind.as_str(), kind.state_size());
    }
    Ok(())
}

/// Print (or save) a rack containing every node kind.
pub fn default_config(output: Option<&Path>) -> Result<()> {
    let rack = RackConfig::with_every_kind();
    match output {
        Some(path) => {
            rack.save(path)?;
            info!("Wrote default rack to {}", path.display());
            println!("Rack written: {}", path.display());
        }
        None => println!("{}", rack.to_json_string()?),
    }
    Ok(())
}
