//! Node table and double-buffered input storage.

use crate::envelope::Envelope;
use crate::error::GraphError;
use crate::node::{Controls, Edge, Node, NodeId, ProcessContext, TRACKS};
use crate::nodes::NodeKind;
use crate::scope::DEFAULT_SCOPE_WIDTH;

/// An append-only set of nodes evaluated in registration order.
///
/// Every node owns two input-slot vectors selected by the parity of the
/// sample index: producers write the current half, consumers read the other
/// one. Because a node only ever reads what was settled one step earlier,
/// the graph can contain cycles without needing a topological order.
///
/// Storage for `capacity` nodes is reserved up front so that appending on the
/// audio context never reallocates.
pub struct Graph {
    pub(crate) nodes: Vec<Node>,
    /// `inputs[i][parity]` are the input slots of node `i`
    pub(crate) inputs: Vec<[Controls; 2]>,
    /// Last value stored by a sink
    pub(crate) audible: f32,
    pub(crate) ctx: ProcessContext,
    capacity: usize,
}

impl Graph {
    pub fn new(ctx: ProcessContext, capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            inputs: Vec::with_capacity(capacity),
            audible: 0.0,
            ctx,
            capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.nodes.len() >= self.capacity
    }

    pub fn context(&self) -> &ProcessContext {
        &self.ctx
    }

    /// Append a node of `kind` with empty envelopes and no outgoing edge.
    pub fn add_node(&mut self, kind: NodeKind) -> Result<NodeId, GraphError> {
        self.add(Node::new(kind, DEFAULT_SCOPE_WIDTH))
    }

    /// Append a fully built node. Its edge may target any existing node or
    /// the node itself.
    pub fn add(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if self.is_full() {
            return Err(GraphError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let id = NodeId::from_index(self.nodes.len());
        if let Some(edge) = node.edge() {
            if edge.to.index() > id.index() {
                return Err(GraphError::UnknownNode(edge.to));
            }
        }

        self.nodes.push(node);
        self.inputs.push([[0.0; TRACKS]; 2]);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::from_index(i), node))
    }

    /// Point `from`'s output at `edge`, or disconnect it with `None`.
    pub fn set_edge(&mut self, from: NodeId, edge: Option<Edge>) -> Result<(), GraphError> {
        if let Some(edge) = edge {
            self.check(edge.to)?;
        }
        self.node_mut(from)?.set_edge(edge);
        Ok(())
    }

    /// Replace envelope `track` of node `id`, returning the old one.
    pub fn set_envelope(&mut self, id: NodeId, track: usize, envelope: Envelope) -> Result<Envelope, GraphError> {
        self.node_mut(id)?.replace_envelope(track, envelope)
    }

    /// The input slots of `id` for the given parity half.
    pub fn inputs(&self, id: NodeId, parity: usize) -> Option<Controls> {
        self.inputs.get(id.index()).map(|halves| halves[parity & 1])
    }

    /// The sample most recently stored by a sink.
    #[inline]
    pub fn audible(&self) -> f32 {
        self.audible
    }

    /// Return every node, envelope and buffer to its initial state.
    pub fn reset(&mut self) {
        self.nodes.iter_mut().for_each(Node::reset);
        self.inputs.iter_mut().for_each(|halves| *halves = [[0.0; TRACKS]; 2]);
        self.audible = 0.0;
    }

    fn check(&self, id: NodeId) -> Result<(), GraphError> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(id.index()).ok_or(GraphError::UnknownNode(id))
    }
}
