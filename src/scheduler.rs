//! One-sample evaluation of the graph.

use crate::graph::Graph;
use crate::nodes::Output;

/// Drives a [`Graph`] forward one sample at a time.
///
/// For a fixed graph the output is a pure function of the sample offset;
/// [`rewind`](Self::rewind) returns to offset 0 with all state cleared so a
/// replay matches a fresh run bit for bit.
pub struct Scheduler {
    graph: Graph,
    offset: u64,
}

impl Scheduler {
    pub fn new(graph: Graph) -> Self {
        Self { graph, offset: 0 }
    }

    /// Offset of the next sample to be computed.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Compute one sample and return the audible value.
    ///
    /// O(nodes), no allocation, no locking.
    pub fn step(&mut self) -> f32 {
        let t = self.offset;
        let current = (t & 1) as usize;
        let previous = current ^ 1;

        let Graph {
            nodes,
            inputs,
            audible,
            ctx,
            ..
        } = &mut self.graph;

        // Envelope values seed this step's half; routed outputs add on top.
        for (node, halves) in nodes.iter_mut().zip(inputs.iter_mut()) {
            halves[current] = node.advance_envelopes(t);
        }

        for (i, node) in nodes.iter_mut().enumerate() {
            let input = inputs[i][previous];
            let output = node.evaluate(&input, t, ctx);

            if let Output::Audible(sample) = output {
                *audible = sample;
            }

            if let Some(edge) = node.edge() {
                let value = output.routed();
                if let Some(halves) = inputs.get_mut(edge.to.index()) {
                    halves[current][edge.slot.index()] += value;
                }
                node.monitor().scope.push(value);
            }
        }

        self.offset += 1;
        *audible
    }

    /// Fill `out` with consecutive samples.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.step();
        }
    }

    /// Back to offset 0 with node state, envelope cursors and buffers cleared.
    pub fn rewind(&mut self) {
        self.graph.reset();
        self.offset = 0;
    }
}
