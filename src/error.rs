//! Error types.
//!
//! None of these cross the audio path: everything the scheduler touches is
//! validated before it is handed to the audio context.

use std::time::Duration;

use thiserror::Error;

use crate::node::NodeId;

/// Errors from graph mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The node table is full.
    #[error("node table is full ({capacity} nodes)")]
    CapacityExceeded {
        /// Maximum number of nodes the graph holds.
        capacity: usize,
    },

    /// The node index does not refer to an existing node.
    #[error("no node with index {0}")]
    UnknownNode(NodeId),

    /// Envelope track index out of range (nodes have four tracks).
    #[error("envelope track {0} out of range")]
    InvalidTrack(usize),
}

/// Rejected envelope programs.
///
/// These are authoring mistakes; they are caught when the envelope is built so
/// the evaluator never has to deal with them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// An event is positioned before the event preceding it.
    #[error("event {index} at position {position} precedes previous event at {previous}")]
    NonMonotonic {
        index: usize,
        position: u64,
        previous: u64,
    },

    /// A loop of length zero would never let time advance.
    #[error("loop at event {index} has zero length")]
    ZeroLengthLoop { index: usize },

    /// The event follows a `Loop` or `End` and can never run.
    #[error("event {index} follows a loop or end marker and is unreachable")]
    UnreachableEvent { index: usize },
}

/// Errors from the editor bridge.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// The audio side has not drained enough commands yet; try again later.
    #[error("command queue is full")]
    QueueFull,
}

/// Output device failures. Fatal to the audio bridge.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No output device is present.
    #[error("no output device available")]
    NoDevice,

    /// The device never signalled readiness.
    #[error("output device not ready after {timeout:?}")]
    Unavailable { timeout: Duration },

    /// The device connection failed or terminated.
    #[error("output device failed: {0}")]
    Failed(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
}
