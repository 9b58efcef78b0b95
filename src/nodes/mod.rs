//! Built-in node kinds.
//!
//! The set is closed: every kind is a variant of [`NodeKind`] and is evaluated
//! by [`NodeKind::evaluate`].
//!
//! ## Sources ([`source`])
//!
//! Oscillators; control slot 0 is pitch in octaves above the base frequency:
//! - [`NodeKind::Square`] - `±1` square wave
//! - [`NodeKind::Sine`] - sine wave
//!
//! ## Effects ([`effect`])
//!
//! - [`NodeKind::LowPass`] - one-pole low-pass; slot 0 is the signal, slot 1 the cutoff
//!
//! ## Sinks ([`sink`])
//!
//! - [`NodeKind::Sink`] - slot 0 becomes the audible output sample
//!
//! The order of [`NodeKind::ALL`] is the editor's toolbar order.

pub mod effect;
pub mod sink;
pub mod source;

use crate::node::{Controls, ProcessContext};

/// What a node function produced for one sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Output {
    /// A value to route along the node's edge.
    Signal(f32),
    /// The sample to play; nothing is routed downstream.
    Audible(f32),
}

impl Output {
    /// The value carried along the node's edge.
    #[inline]
    pub fn routed(self) -> f32 {
        match self {
            Output::Signal(v) => v,
            Output::Audible(_) => 0.0,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NodeKind {
    Square,
    LowPass,
    Sink,
    Sine,
}

impl NodeKind {
    pub const ALL: [NodeKind; 4] = [NodeKind::Square, NodeKind::LowPass, NodeKind::Sink, NodeKind::Sine];

    /// Kind shown at toolbar position `icon`.
    pub fn from_icon(icon: usize) -> Option<Self> {
        Self::ALL.get(icon).copied()
    }

    /// Toolbar position (and icon index) of this kind.
    pub fn icon(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Square => "square",
            NodeKind::LowPass => "lowpass",
            NodeKind::Sink => "sink",
            NodeKind::Sine => "sine",
        }
    }

    /// Compute one sample. `state` is the node's persistent scalar.
    #[inline]
    pub fn evaluate(self, state: &mut f32, inputs: &Controls, t: u64, ctx: &ProcessContext) -> Output {
        match self {
            NodeKind::Square => Output::Signal(source::square(inputs, t, ctx)),
            NodeKind::Sine => Output::Signal(source::sine(inputs, t, ctx)),
            NodeKind::LowPass => Output::Signal(effect::lowpass(state, inputs, ctx)),
            NodeKind::Sink => Output::Audible(sink::audible(inputs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolbar_order_round_trips() {
        for (i, kind) in NodeKind::ALL.iter().enumerate() {
            assert_eq!(kind.icon(), i);
            assert_eq!(NodeKind::from_icon(i), Some(*kind));
        }
        assert_eq!(NodeKind::from_icon(4), None);
    }

    #[test]
    fn sink_routes_nothing() {
        let ctx = ProcessContext {
            sample_rate: 96_000,
            base_frequency: 440.0,
        };
        let mut state = 0.0;
        let out = NodeKind::Sink.evaluate(&mut state, &[0.5, 0.0, 0.0, 0.0], 0, &ctx);
        assert_eq!(out, Output::Audible(0.5));
        assert_eq!(out.routed(), 0.0);
    }
}
