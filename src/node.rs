//! Node units and the types that address them.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::envelope::Envelope;
use crate::error::GraphError;
use crate::nodes::{NodeKind, Output};
use crate::scope::Scope;

/// Envelope tracks (and input slots) per node.
pub const TRACKS: usize = 4;

/// One value per input slot.
pub type Controls = [f32; TRACKS];

/// Information available to node functions on every sample.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    /// Sample rate of the graph in Hz
    pub sample_rate: u32,
    /// Frequency of a control value of `0.0`
    pub base_frequency: f32,
}

impl ProcessContext {
    /// Map a control value to Hz: one octave per unit above the base frequency.
    #[inline]
    pub fn frequency(&self, control: f32) -> f32 {
        self.base_frequency * control.exp2()
    }

    /// Global sample offset in seconds.
    #[inline]
    pub fn seconds(&self, t: u64) -> f64 {
        t as f64 / self.sample_rate as f64
    }

    /// Duration of one sample in seconds.
    #[inline]
    pub fn dt(&self) -> f32 {
        1.0 / self.sample_rate as f32
    }
}

/// Position of a node in the graph's registration order.
///
/// The graph only ever appends, so an id stays valid for the life of the graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of a node's four input slots.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Slot(u8);

impl Slot {
    pub const ALL: [Slot; TRACKS] = [Slot(0), Slot(1), Slot(2), Slot(3)];

    pub fn new(index: usize) -> Option<Self> {
        (index < TRACKS).then_some(Slot(index as u8))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a node's output goes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Edge {
    pub to: NodeId,
    pub slot: Slot,
}

impl Edge {
    pub fn new(to: NodeId, slot: Slot) -> Self {
        Self { to, slot }
    }
}

/// State of a node the editor may look at while the audio side runs.
#[derive(Debug)]
pub struct NodeMonitor {
    pub scope: Scope,
    /// Latest envelope values, stored as `f32` bits
    controls: [AtomicU32; TRACKS],
}

impl NodeMonitor {
    pub fn new(scope_width: usize) -> Self {
        Self {
            scope: Scope::new(scope_width),
            controls: Default::default(),
        }
    }

    /// Latest value of envelope `track` (0 for an out-of-range track).
    pub fn control(&self, track: usize) -> f32 {
        self.controls
            .get(track)
            .map_or(0.0, |c| f32::from_bits(c.load(Ordering::Relaxed)))
    }

    fn publish(&self, controls: &Controls) {
        for (cell, value) in self.controls.iter().zip(controls) {
            cell.store(value.to_bits(), Ordering::Relaxed);
        }
    }
}

/// A computational cell: a node function, its persistent state, its
/// automation tracks and its single outgoing edge.
#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    /// The only memory a node function keeps between samples
    state: f32,
    envelopes: [Envelope; TRACKS],
    edge: Option<Edge>,
    monitor: Arc<NodeMonitor>,
}

impl Node {
    /// A node with empty envelopes and no outgoing edge.
    pub fn new(kind: NodeKind, scope_width: usize) -> Self {
        Self {
            kind,
            state: 0.0,
            envelopes: Default::default(),
            edge: None,
            monitor: Arc::new(NodeMonitor::new(scope_width)),
        }
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edge = Some(edge);
        self
    }

    /// Install `envelope` on `track` (builder form of [`replace_envelope`](Self::replace_envelope)).
    pub fn with_envelope(mut self, track: usize, envelope: Envelope) -> Result<Self, GraphError> {
        self.replace_envelope(track, envelope)?;
        Ok(self)
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub fn state(&self) -> f32 {
        self.state
    }

    #[inline]
    pub fn edge(&self) -> Option<Edge> {
        self.edge
    }

    pub(crate) fn set_edge(&mut self, edge: Option<Edge>) {
        self.edge = edge;
    }

    pub fn envelope(&self, track: usize) -> Option<&Envelope> {
        self.envelopes.get(track)
    }

    /// Swap in a new envelope, returning the one it replaces.
    pub fn replace_envelope(&mut self, track: usize, envelope: Envelope) -> Result<Envelope, GraphError> {
        let slot = self
            .envelopes
            .get_mut(track)
            .ok_or(GraphError::InvalidTrack(track))?;
        Ok(std::mem::replace(slot, envelope))
    }

    /// Shared view for the editor side.
    pub fn monitor(&self) -> &Arc<NodeMonitor> {
        &self.monitor
    }

    /// Forget all playback state: node memory and envelope cursors.
    pub fn reset(&mut self) {
        self.state = 0.0;
        self.envelopes.iter_mut().for_each(Envelope::reset);
    }

    /// Evaluate every envelope at `t`.
    pub(crate) fn advance_envelopes(&mut self, t: u64) -> Controls {
        let mut controls = [0.0; TRACKS];
        for (value, envelope) in controls.iter_mut().zip(self.envelopes.iter_mut()) {
            *value = envelope.advance(t);
        }
        self.monitor.publish(&controls);
        controls
    }

    /// Run the node function for one sample.
    #[inline]
    pub(crate) fn evaluate(&mut self, inputs: &Controls, t: u64, ctx: &ProcessContext) -> Output {
        self.kind.evaluate(&mut self.state, inputs, t, ctx)
    }
}
