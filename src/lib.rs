//! Patchwire is a sample-at-a-time modular synthesis engine.
//!
//! A [`Graph`] of nodes is evaluated once per output sample by the
//! [`Scheduler`]. Every node owns a [`NodeKind`], one scalar of state, four
//! [envelope](envelope) tracks and at most one outgoing [`Edge`]. Inputs are
//! double buffered, so routing may contain cycles; each hop costs one sample.
//!
//! The [`Engine`] runs on the audio context and renders blocks on request. Its
//! [`Editor`] lives on the UI side and changes the graph through a lock-free
//! command queue; changes take effect between two samples.
//!
//! ```
//! use patchwire::{Block, Config, Engine, NodeKind, Slot};
//!
//! let (mut engine, mut editor) = Engine::new(Config::default().running());
//! let sink = editor.add_node_at(NodeKind::Sink, 0.0, 0.0)?;
//! let osc = editor.add_node_at(NodeKind::Sine, 64.0, 0.0)?;
//! editor.connect(osc, sink, Slot::ALL[0])?;
//!
//! let mut out = [0.0f32; 128];
//! assert_eq!(engine.fill_f32(&mut out), Block::Rendered(128));
//! # Ok::<(), patchwire::EditorError>(())
//! ```
//!
//! With the `cpal_sink` feature an engine can be handed to an output device,
//! see [`CpalDevice`].

pub mod config;
pub mod device;
pub mod editor;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod patch;
pub mod scheduler;
pub mod scope;

pub use config::Config;
pub use device::{CpalDevice, Handshake, Readiness};
pub use editor::{Editor, Key, NodeView, Point};
pub use engine::{Block, Command, DeviceEvent, DeviceStatus, Engine};
pub use envelope::{Envelope, Event};
pub use error::{DeviceError, EditorError, EnvelopeError, GraphError};
pub use graph::Graph;
pub use node::{Controls, Edge, Node, NodeId, NodeMonitor, ProcessContext, Slot, TRACKS};
pub use nodes::{NodeKind, Output};
pub use scheduler::Scheduler;
pub use scope::{Scope, ScopeSnapshot};

#[cfg(feature = "cpal_sink")]
pub use device::Playback;
