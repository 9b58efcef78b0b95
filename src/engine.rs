//! Audio-side engine: drains editor commands and renders blocks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{error, info, trace, warn};

use crate::config::Config;
use crate::editor::Editor;
use crate::envelope::Envelope;
use crate::graph::Graph;
use crate::node::{Edge, Node, NodeId};
use crate::scheduler::Scheduler;

/// Amplitude of a full-scale sample in the 32-bit output format.
pub const PCM_SCALE: f32 = 0x7fff as f32;

/// Bytes per output sample.
pub const PCM_BYTES: usize = 4;

/// Convert a sample to the device's fixed-point format.
#[inline]
pub fn to_pcm(sample: f32) -> i32 {
    (sample.clamp(-1.0, 1.0) * PCM_SCALE).round() as i32
}

/// A graph mutation or transport change, applied between two samples.
#[derive(Debug)]
pub enum Command {
    /// Append a node. It is fully built before it is sent.
    AddNode(Node),
    SetEdge { node: NodeId, edge: Option<Edge> },
    SetEnvelope { node: NodeId, track: usize, envelope: Envelope },
    SetPaused(bool),
    /// Reset time to 0 along with all node and envelope state.
    Rewind,
}

/// Something the output driver wants the engine to know.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// The device ran out of samples. Playback continues.
    Underflow,
    /// The connection is gone. Rendering stops for good.
    Failed(String),
}

/// Result of a block request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    /// This many samples were produced.
    Rendered(usize),
    /// The transport is paused; time did not advance and nothing was written.
    Paused,
    /// The device failed; nothing will be rendered again.
    Halted,
}

/// Engine state the editor can observe.
#[derive(Debug)]
pub(crate) struct Status {
    pub(crate) paused: AtomicBool,
    pub(crate) halted: AtomicBool,
    pub(crate) offset: AtomicU64,
    pub(crate) underflows: AtomicU64,
}

impl Status {
    fn new(paused: bool) -> Self {
        Self {
            paused: AtomicBool::new(paused),
            halted: AtomicBool::new(false),
            offset: AtomicU64::new(0),
            underflows: AtomicU64::new(0),
        }
    }
}

/// Driver-side handle for reporting [`DeviceEvent`]s.
///
/// Reports land in state shared with the [`Engine`] and its [`Editor`], so a
/// failure is visible even if the engine is never asked for another block.
#[derive(Clone, Debug)]
pub struct DeviceStatus {
    status: Arc<Status>,
}

impl DeviceStatus {
    pub fn report(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::Underflow => {
                let total = self.status.underflows.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(total, offset = self.status.offset.load(Ordering::Relaxed), "underflow");
            }
            DeviceEvent::Failed(reason) => {
                if !self.status.halted.swap(true, Ordering::AcqRel) {
                    error!(%reason, "output device failed, stopping");
                }
            }
        }
    }

    pub fn failed(&self) -> bool {
        self.status.halted.load(Ordering::Acquire)
    }

    pub fn underflows(&self) -> u64 {
        self.status.underflows.load(Ordering::Relaxed)
    }
}

/// The audio bridge.
///
/// Lives on the audio context. Each call to [`fill_block`](Self::fill_block)
/// (or [`render`](Self::render)) first applies every pending [`Command`] from
/// the [`Editor`], then steps the scheduler once per requested sample. Edits
/// therefore only ever land between two samples.
///
/// ```
/// use patchwire::{Config, Engine, NodeKind};
///
/// let (mut engine, mut editor) = Engine::new(Config::default().running());
/// editor.add_node_at(NodeKind::Sink, 100.0, 100.0).unwrap();
///
/// let mut pcm = [0u8; 64];
/// engine.fill_block(&mut pcm);
/// assert_eq!(engine.graph().len(), 1);
/// ```
pub struct Engine {
    scheduler: Scheduler,
    commands: Consumer<Command>,
    /// Envelopes replaced on this side, handed back to be freed by the editor
    retired: Producer<Envelope>,
    status: Arc<Status>,
    paused: bool,
    config: Config,
}

impl Engine {
    /// Create an empty engine and the editor that controls it.
    pub fn new(config: Config) -> (Engine, Editor) {
        let (command_tx, command_rx) = RingBuffer::new(config.command_capacity);
        let (retired_tx, retired_rx) = RingBuffer::new(config.command_capacity);
        let status = Arc::new(Status::new(config.start_paused));

        let graph = Graph::new(config.process_context(), config.max_nodes);
        let engine = Engine {
            scheduler: Scheduler::new(graph),
            commands: command_rx,
            retired: retired_tx,
            status: status.clone(),
            paused: config.start_paused,
            config: config.clone(),
        };
        let editor = Editor::new(config, command_tx, retired_rx, status);

        (engine, editor)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        self.scheduler.graph()
    }

    /// Offset of the next sample to be rendered.
    pub fn offset(&self) -> u64 {
        self.scheduler.offset()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_halted(&self) -> bool {
        self.status.halted.load(Ordering::Acquire)
    }

    pub fn underflows(&self) -> u64 {
        self.status.underflows.load(Ordering::Relaxed)
    }

    /// Apply every queued editor command now.
    pub fn apply_pending(&mut self) {
        while let Ok(command) = self.commands.pop() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::AddNode(node) => {
                let kind = node.kind();
                match self.scheduler.graph_mut().add(node) {
                    Ok(id) => trace!(%id, kind = kind.name(), "node added"),
                    Err(err) => warn!(%err, "dropping node"),
                }
            }
            Command::SetEdge { node, edge } => {
                if let Err(err) = self.scheduler.graph_mut().set_edge(node, edge) {
                    warn!(%err, "dropping edge change");
                }
            }
            Command::SetEnvelope { node, track, envelope } => {
                match self.scheduler.graph_mut().set_envelope(node, track, envelope) {
                    // if the editor is not collecting, the old one is freed here
                    Ok(old) => {
                        let _ = self.retired.push(old);
                    }
                    Err(err) => warn!(%err, "dropping envelope"),
                }
            }
            Command::SetPaused(paused) => {
                if paused != self.paused {
                    info!(paused, offset = self.offset(), "transport");
                }
                self.paused = paused;
                self.status.paused.store(paused, Ordering::Relaxed);
            }
            Command::Rewind => {
                info!(from = self.offset(), "rewind");
                self.scheduler.rewind();
                self.status.offset.store(0, Ordering::Relaxed);
            }
        }
    }

    /// Render `frames` samples, handing each to `write(index, sample)`.
    ///
    /// Commands are applied first. Nothing is written while paused or halted.
    pub fn render(&mut self, frames: usize, mut write: impl FnMut(usize, f32)) -> Block {
        self.apply_pending();

        if self.is_halted() {
            return Block::Halted;
        }
        if self.paused {
            return Block::Paused;
        }

        for i in 0..frames {
            write(i, self.scheduler.step());
        }
        self.status.offset.store(self.scheduler.offset(), Ordering::Relaxed);
        Block::Rendered(frames)
    }

    /// Fill `out` with little-endian 32-bit fixed-point samples.
    ///
    /// `out.len() / 4` samples are produced; trailing bytes are left alone.
    pub fn fill_block(&mut self, out: &mut [u8]) -> Block {
        let frames = out.len() / PCM_BYTES;
        self.render(frames, |i, sample| {
            let at = i * PCM_BYTES;
            out[at..at + PCM_BYTES].copy_from_slice(&to_pcm(sample).to_le_bytes());
        })
    }

    /// Fill `out` with float samples.
    pub fn fill_f32(&mut self, out: &mut [f32]) -> Block {
        let frames = out.len();
        self.render(frames, |i, sample| out[i] = sample)
    }

    /// A handle the output driver keeps to report conditions from its own
    /// callbacks, independently of block requests.
    pub fn device_status(&self) -> DeviceStatus {
        DeviceStatus {
            status: self.status.clone(),
        }
    }

    /// Tell the engine about a driver-side condition.
    pub fn device_event(&mut self, event: DeviceEvent) {
        self.device_status().report(event);
    }

    /// Count a device underflow.
    pub fn report_underflow(&mut self) {
        self.device_event(DeviceEvent::Underflow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NodeKind;

    #[test]
    fn pcm_scaling_clamps() {
        assert_eq!(to_pcm(0.0), 0);
        assert_eq!(to_pcm(1.0), 0x7fff);
        assert_eq!(to_pcm(-1.0), -0x7fff);
        assert_eq!(to_pcm(4.0), 0x7fff);
        assert_eq!(to_pcm(0.5), 16384);
    }

    #[test]
    fn paused_engine_keeps_time_still() {
        let (mut engine, _editor) = Engine::new(Config::default());
        let mut out = [0xAAu8; 16];

        assert_eq!(engine.fill_block(&mut out), Block::Paused);
        assert_eq!(engine.offset(), 0);
        assert_eq!(out, [0xAA; 16]);
    }

    #[test]
    fn running_engine_advances_per_sample() {
        let (mut engine, _editor) = Engine::new(Config::default().running());
        let mut out = [0u8; 4 * 10 + 3];

        assert_eq!(engine.fill_block(&mut out), Block::Rendered(10));
        assert_eq!(engine.offset(), 10);
    }

    #[test]
    fn failure_halts_rendering() {
        let (mut engine, _editor) = Engine::new(Config::default().running());
        engine.device_event(DeviceEvent::Failed("gone".into()));

        let mut out = [0.0f32; 8];
        assert_eq!(engine.fill_f32(&mut out), Block::Halted);
        assert!(engine.is_halted());
    }

    #[test]
    fn failure_reported_from_driver_is_seen_without_a_block() {
        let (mut engine, editor) = Engine::new(Config::default().running());
        let device = engine.device_status();

        device.report(DeviceEvent::Failed("unplugged".into()));
        assert!(device.failed());
        assert!(editor.device_failed());
        assert!(engine.is_halted());

        let mut out = [0.0f32; 4];
        assert_eq!(engine.fill_f32(&mut out), Block::Halted);
        assert_eq!(engine.offset(), 0);
    }

    #[test]
    fn underflow_is_counted_not_fatal() {
        let (mut engine, _editor) = Engine::new(Config::default().running());
        engine.device_event(DeviceEvent::Underflow);
        engine.report_underflow();

        assert_eq!(engine.underflows(), 2);
        let mut out = [0.0f32; 4];
        assert_eq!(engine.fill_f32(&mut out), Block::Rendered(4));
    }

    #[test]
    fn commands_apply_at_block_start() {
        let (mut engine, mut editor) = Engine::new(Config::default().running());
        let sink = editor.add_node_at(NodeKind::Sink, 0.0, 0.0).unwrap();
        assert!(engine.graph().is_empty());

        engine.fill_f32(&mut [0.0; 1]);
        assert!(engine.graph().node(sink).is_some());
    }
}
