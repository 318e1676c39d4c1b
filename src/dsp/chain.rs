//! Effect chain dispatch
//!
//! A [`Chain`] is an ordered list of [`Node`]s, each holding one effect kind
//! and its per-channel states. Processing walks the nodes in order (index 0
//! first), dispatching on the node's kind. An empty chain is a no-op.
//!
//! Delay and gate states own nested chains (the delay's wet effects, the
//! gate's activation effects), which run on single-sample views.

use super::compressor::Compressor;
use super::delay::Delay;
use super::effect::{DspKind, Effect};
use super::filter::Filter;
use super::gate::Gate;
use super::limiter::{cubic_limiter, LookaheadLimiter};
use super::reverb::Reverb;
use super::rms::Rms;
use super::sampler::Sampler;
use crate::engine::Buffer;
use crate::error::{DspError, Result};

/// One effect in a chain: its kind plus one state per channel
#[derive(Debug, Clone)]
pub enum Node {
    Rms(Vec<Rms>),
    Filter(Vec<Filter>),
    LookaheadLimiter(Vec<LookaheadLimiter>),
    Compressor(Vec<Compressor>),
    Delay(Vec<Delay>),
    Reverb(Vec<Reverb>),
    Sampler(Vec<Sampler>),
    Gate(Vec<Gate>),
    /// Stateless soft clip
    CubicLimiter,
}

/// Expands `$body` once per stateful variant with `$states` bound to the
/// state vector and `$ty` to its element type
macro_rules! for_each_stateful {
    ($node:expr, $states:ident, $ty:ident => $body:expr, $stateless:expr) => {
        match $node {
            Node::Rms($states) => {
                type $ty = Rms;
                $body
            }
            Node::Filter($states) => {
                type $ty = Filter;
                $body
            }
            Node::LookaheadLimiter($states) => {
                type $ty = LookaheadLimiter;
                $body
            }
            Node::Compressor($states) => {
                type $ty = Compressor;
                $body
            }
            Node::Delay($states) => {
                type $ty = Delay;
                $body
            }
            Node::Reverb($states) => {
                type $ty = Reverb;
                $body
            }
            Node::Sampler($states) => {
                type $ty = Sampler;
                $body
            }
            Node::Gate($states) => {
                type $ty = Gate;
                $body
            }
            Node::CubicLimiter => $stateless,
        }
    };
}

macro_rules! impl_node_from {
    ($($variant:ident),*) => {
        $(
            impl From<Vec<$variant>> for Node {
                fn from(states: Vec<$variant>) -> Self {
                    Node::$variant(states)
                }
            }
        )*
    };
}

impl_node_from!(Rms, Filter, LookaheadLimiter, Compressor, Delay, Reverb, Sampler, Gate);

impl Node {
    /// Effect kind of this node
    pub fn kind(&self) -> DspKind {
        for_each_stateful!(self, _states, T => T::KIND, DspKind::CubicLimiter)
    }

    /// In-memory size of this node's state array in bytes
    pub fn struct_size(&self) -> usize {
        for_each_stateful!(self, states, T => std::mem::size_of_val::<[T]>(states.as_slice()), 0)
    }

    /// Number of per-channel states, `None` for stateless nodes
    pub fn channels(&self) -> Option<usize> {
        for_each_stateful!(self, states, _T => Some(states.len()), None)
    }

    /// Process `buffer` in place with this node's effect
    pub fn process(&mut self, buffer: &mut Buffer<'_>) -> Result<()> {
        for_each_stateful!(self, states, T => T::process(buffer, states), cubic_limiter(buffer))
    }

    /// Clear every state's history
    pub fn reset(&mut self) {
        for_each_stateful!(
            self,
            states,
            _T => states.iter_mut().for_each(Effect::reset),
            ()
        )
    }
}

/// Ordered chain of effect nodes
#[derive(Debug, Clone, Default)]
pub struct Chain {
    nodes: Vec<Node>,
}

impl Chain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node at the end of the chain
    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Insert a node at `index`, clamped to the chain length
    pub fn insert(&mut self, index: usize, node: Node) {
        let index = index.min(self.nodes.len());
        self.nodes.insert(index, node);
    }

    /// Remove and return the node at `index`
    pub fn remove(&mut self, index: usize) -> Option<Node> {
        if index < self.nodes.len() {
            Some(self.nodes.remove(index))
        } else {
            None
        }
    }

    /// Move a node to a new position
    pub fn move_node(&mut self, from: usize, to: usize) -> Option<()> {
        let node = self.remove(from)?;
        self.insert(to, node);
        Some(())
    }

    /// Get a node by index
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Get a mutable node by index
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_mut(index)
    }

    /// Nodes in processing order
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Mutable nodes in processing order
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Node> {
        self.nodes.iter_mut()
    }

    /// Get the number of nodes in the chain
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Kinds of every node, in processing order
    pub fn kinds(&self) -> Vec<DspKind> {
        self.nodes.iter().map(Node::kind).collect()
    }

    /// Process the chain in order, stopping at the first failing node
    pub fn process(&mut self, buffer: &mut Buffer<'_>) -> Result<()> {
        for node in &mut self.nodes {
            node.process(buffer)?;
        }
        Ok(())
    }

    /// Reset every node
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
    }

    /// Check every stateful node carries states for at least `channels`
    pub fn check_channels(&self, channels: usize) -> Result<()> {
        for node in &self.nodes {
            if let Some(available) = node.channels() {
                if available < channels {
                    return Err(DspError::NullPointer);
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl FromIterator<Node> for Chain {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{CompressorParams, DelayParams};
    use pretty_assertions::assert_eq;

    fn stereo(samples: Vec<f32>) -> Buffer<'static> {
        Buffer::from_interleaved(samples, 2, 48000).unwrap()
    }

    #[test]
    fn test_empty_chain_is_noop() {
        let mut chain = Chain::new();
        let mut buffer = stereo(vec![0.1, 0.2, 0.3, 0.4]);
        chain.process(&mut buffer).unwrap();
        assert_eq!(buffer.samples(), &[0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_nodes_run_in_order() {
        // Cubic limiter then RMS differs from RMS then cubic limiter
        let mut first = Chain::new();
        first.push(Node::CubicLimiter);
        first.push(Node::from(vec![Rms::new()]));
        let mut second = Chain::new();
        second.push(Node::from(vec![Rms::new()]));
        second.push(Node::CubicLimiter);

        let mut a = Buffer::from_interleaved(vec![4.0], 1, 48000).unwrap();
        let mut b = Buffer::from_interleaved(vec![4.0], 1, 48000).unwrap();
        first.process(&mut a).unwrap();
        second.process(&mut b).unwrap();
        assert_eq!(a.samples()[0], (1.0_f32 / 128.0).sqrt());
        assert!((b.samples()[0] - (4.0_f32 * 4.0 / 128.0).sqrt()).abs() > 1e-3);
    }

    #[test]
    fn test_kind_and_sizes() {
        let node = Node::from(vec![Filter::default(), Filter::default()]);
        assert_eq!(node.kind(), DspKind::Filter);
        assert_eq!(node.channels(), Some(2));
        assert_eq!(node.struct_size(), 2 * std::mem::size_of::<Filter>());
        assert_eq!(node.struct_size(), 2 * DspKind::Filter.state_size());

        assert_eq!(Node::CubicLimiter.kind(), DspKind::CubicLimiter);
        assert_eq!(Node::CubicLimiter.struct_size(), 0);
        assert_eq!(Node::CubicLimiter.channels(), None);
    }

    #[test]
    fn test_check_channels() {
        let mut chain = Chain::new();
        chain.push(Node::CubicLimiter);
        assert!(chain.check_channels(8).is_ok());
        chain.push(Node::from(vec![Compressor::new(CompressorParams::default())]));
        assert!(chain.check_channels(1).is_ok());
        assert!(matches!(
            chain.check_channels(2),
            Err(DspError::NullPointer)
        ));
    }

    #[test]
    fn test_missing_states_reported() {
        let mut chain = Chain::new();
        chain.push(Node::from(vec![Delay::new(DelayParams::default())]));
        let mut buffer = stereo(vec![0.5; 8]);
        let err = chain.process(&mut buffer).unwrap_err();
        assert!(matches!(err, DspError::NullPointer));
        assert!(buffer.samples().iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_edit_operations() {
        let mut chain: Chain = vec![
            Node::from(vec![Rms::new()]),
            Node::CubicLimiter,
            Node::from(vec![Filter::default()]),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            chain.kinds(),
            vec![DspKind::Rms, DspKind::CubicLimiter, DspKind::Filter]
        );

        chain.move_node(2, 0).unwrap();
        assert_eq!(chain.get(0).map(Node::kind), Some(DspKind::Filter));

        let removed = chain.remove(1).unwrap();
        assert_eq!(removed.kind(), DspKind::Rms);
        assert!(chain.remove(5).is_none());

        chain.insert(100, Node::from(vec![Gate::default()]));
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.kinds()[2], DspKind::Gate);
        assert_eq!((&chain).into_iter().count(), 3);
    }

    #[test]
    fn test_reset_clears_every_node() {
        let mut chain = Chain::new();
        chain.push(Node::from(vec![Rms::new()]));
        let mut buffer = Buffer::from_interleaved(vec![1.0; 16], 1, 48000).unwrap();
        chain.process(&mut buffer).unwrap();
        chain.reset();
        let mut silence = Buffer::from_interleaved(vec![0.0; 4], 1, 48000).unwrap();
        chain.process(&mut silence).unwrap();
        assert!(silence.samples().iter().all(|&s| s == 0.0));
    }
}
