//! Rack configuration
//!
//! A rack is a JSON description of a processing chain plus the stream format
//! it runs at. Each node names its kind and carries that effect's parameters;
//! delay and gate nodes nest their own single-channel sub-chains.
//!
//! ```json
//! {
//!   "samplerate": 48000,
//!   "channels": 2,
//!   "block_frames": 512,
//!   "nodes": [
//!     { "kind": "filter", "response": "high_pass", "frequency": 80.0 },
//!     { "kind": "compressor", "threshold": -18.0, "ratio": 4.0 },
//!     { "kind": "lookahead_limiter", "gain_output": -0.3 }
//!   ]
//! }
//! ```

use crate::dsp::{
    Chain, Compressor, CompressorParams, Delay, DelayParams, Filter, FilterKind, FilterParams,
    Gate, GateParams, LookaheadLimiter, LookaheadLimiterParams, Node, Reverb, ReverbParams, Rms,
    Sampler, SamplerParams,
};
use crate::engine::{generate_signal, ms_to_samples, SignalKind};
use crate::error::{DspError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Stream format and processing chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RackConfig {
    /// Samples per second
    pub samplerate: u32,
    /// Interleaved channel count; every stateful node gets one state each
    pub channels: usize,
    /// Frames per processing block
    pub block_frames: usize,
    /// Nodes in processing order
    pub nodes: Vec<NodeConfig>,
}

impl Default for RackConfig {
    fn default() -> Self {
        Self {
            samplerate: 48000,
            channels: 2,
            block_frames: 512,
            nodes: Vec::new(),
        }
    }
}

/// Generated source material for a sampler node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub signal: SignalKind,
    /// Frequency in Hz (sine only)
    pub frequency: f32,
    pub amplitude: f32,
    /// Length of the looped source in ms
    pub length: f32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            signal: SignalKind::Sine,
            frequency: 440.0,
            amplitude: 0.5,
            length: 1000.0,
        }
    }
}

/// One node of a rack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeConfig {
    Rms,
    Filter(FilterParams),
    LookaheadLimiter(LookaheadLimiterParams),
    Compressor(CompressorParams),
    Delay {
        #[serde(flatten)]
        params: DelayParams,
        /// Longest delay time in ms to allocate for up front
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_delay: Option<f32>,
        /// Effects applied to the wet signal only
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        wet_effects: Vec<NodeConfig>,
    },
    Reverb(ReverbParams),
    Sampler {
        #[serde(flatten)]
        params: SamplerParams,
        #[serde(default)]
        source: SourceConfig,
    },
    Gate {
        #[serde(flatten)]
        params: GateParams,
        /// Effects applied to the detector signal only
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        activation: Vec<NodeConfig>,
    },
    CubicLimiter,
}

impl NodeConfig {
    /// Validate this node's parameters, including nested chains
    pub fn validate(&self) -> Result<()> {
        match self {
            NodeConfig::Rms | NodeConfig::CubicLimiter => Ok(()),
            NodeConfig::Filter(params) => params.validate(),
            NodeConfig::LookaheadLimiter(params) => params.validate(),
            NodeConfig::Compressor(params) => params.validate(),
            NodeConfig::Delay {
                params,
                max_delay,
                wet_effects,
            } => {
                params.validate()?;
                if let Some(max) = max_delay {
                    if !max.is_finite() || *max < params.delay {
                        return Err(DspError::invalid_param(
                            "max_delay",
                            max,
                            "finite value >= delay",
                        ));
                    }
                }
                wet_effects.iter().try_for_each(NodeConfig::validate)
            }
            NodeConfig::Reverb(params) => params.validate(),
            NodeConfig::Sampler { params, source } => {
                params.validate()?;
                if !source.frequency.is_finite() || !source.amplitude.is_finite() {
                    return Err(DspError::invalid_param(
                        "source",
                        format!("{:?}", source),
                        "finite frequency and amplitude",
                    ));
                }
                if !source.length.is_finite() || source.length <= 0.0 {
                    return Err(DspError::invalid_param(
                        "source.length",
                        source.length,
                        "> 0 ms",
                    ));
                }
                Ok(())
            }
            NodeConfig::Gate { params, activation } => {
                params.validate()?;
                activation.iter().try_for_each(NodeConfig::validate)
            }
        }
    }

    /// Build this node with `channels` states
    pub fn build(&self, channels: usize, samplerate: u32) -> Result<Node> {
        let node = match self {
            NodeConfig::Rms => Node::from(vec![Rms::new(); channels]),
            NodeConfig::Filter(params) => Node::from(vec![Filter::new(params.clone()); channels]),
            NodeConfig::LookaheadLimiter(params) => {
                Node::from(vec![LookaheadLimiter::new(params.clone()); channels])
            }
            NodeConfig::Compressor(params) => {
                Node::from(vec![Compressor::new(params.clone()); channels])
            }
            NodeConfig::Delay {
                params,
                max_delay,
                wet_effects,
            } => {
                let mut states = Vec::with_capacity(channels);
                for _ in 0..channels {
                    let wet = build_chain(wet_effects, 1, samplerate)?;
                    let mut delay = Delay::with_wet_effects(params.clone(), wet);
                    if let Some(max) = max_delay {
                        delay.reserve(*max, samplerate)?;
                    }
                    delay.prepare(samplerate)?;
                    states.push(delay);
                }
                Node::from(states)
            }
            NodeConfig::Reverb(params) => {
                let mut states = Reverb::per_channel(params.clone(), channels);
                for reverb in states.iter_mut() {
                    reverb.prepare(samplerate)?;
                }
                Node::from(states)
            }
            NodeConfig::Sampler { params, source } => {
                let frames = ms_to_samples(source.length, samplerate);
                if frames == 0 {
                    return Err(DspError::Config {
                        reason: format!(
                            "sampler source of {} ms is shorter than one frame at {} Hz",
                            source.length, samplerate
                        ),
                    });
                }
                let buffer = Arc::new(generate_signal(
                    source.signal,
                    source.frequency,
                    source.amplitude,
                    frames,
                    1,
                    samplerate,
                )?);
                let states = (0..channels)
                    .map(|_| Sampler::new(params.clone(), Arc::clone(&buffer)))
                    .collect::<Vec<_>>();
                Node::from(states)
            }
            NodeConfig::Gate { params, activation } => {
                let mut states = Vec::with_capacity(channels);
                for _ in 0..channels {
                    let chain = build_chain(activation, 1, samplerate)?;
                    states.push(Gate::with_activation(params.clone(), chain));
                }
                Node::from(states)
            }
            NodeConfig::CubicLimiter => Node::CubicLimiter,
        };
        debug!(
            "Built {} node: {} states, {} bytes",
            node.kind(),
            node.channels().unwrap_or(0),
            node.struct_size()
        );
        Ok(node)
    }
}

fn build_chain(nodes: &[NodeConfig], channels: usize, samplerate: u32) -> Result<Chain> {
    nodes
        .iter()
        .map(|node| node.build(channels, samplerate))
        .collect()
}

impl RackConfig {
    /// Parse a rack from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a rack from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading rack: {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the rack to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    /// A rack with one node of every kind at neutral settings
    pub fn with_every_kind() -> Self {
        Self {
            nodes: vec![
                NodeConfig::Sampler {
                    params: SamplerParams::default(),
                    source: SourceConfig::default(),
                },
                NodeConfig::Gate {
                    params: GateParams::default(),
                    activation: vec![NodeConfig::Filter(FilterParams {
                        kind: FilterKind::HighPass,
                        frequency: 100.0,
                        dry_mix: 0.0,
                    })],
                },
                NodeConfig::Filter(FilterParams::default()),
                NodeConfig::Compressor(CompressorParams::default()),
                NodeConfig::Delay {
                    params: DelayParams::default(),
                    max_delay: Some(1000.0),
                    wet_effects: vec![NodeConfig::Filter(FilterParams::default())],
                },
                NodeConfig::Reverb(ReverbParams::default()),
                NodeConfig::LookaheadLimiter(LookaheadLimiterParams::default()),
                NodeConfig::CubicLimiter,
                NodeConfig::Rms,
            ],
            ..Default::default()
        }
    }

    /// Validate the stream format and every node
    pub fn validate(&self) -> Result<()> {
        if self.samplerate == 0 {
            return Err(DspError::invalid_param("samplerate", self.samplerate, "> 0 Hz"));
        }
        if self.channels < 1 {
            return Err(DspError::InvalidChannelCount {
                channels: self.channels,
            });
        }
        if self.block_frames < 1 {
            return Err(DspError::InvalidFrameCount {
                frames: self.block_frames,
            });
        }
        self.nodes.iter().try_for_each(NodeConfig::validate)
    }

    /// Validate, then build a chain with one state per channel
    ///
    /// Delay buffers are sized here so the first processed block does not
    /// allocate.
    pub fn build(&self) -> Result<Chain> {
        self.validate()?;
        let chain = build_chain(&self.nodes, self.channels, self.samplerate)?;
        info!(
            "Built rack: {} nodes, {} channels @ {} Hz",
            chain.len(),
            self.channels,
            self.samplerate
        );
        Ok(chain)
    }
}
