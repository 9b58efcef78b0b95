//! UI-side control of the engine.
//!
//! The [`Editor`] keeps its own picture of the graph (kinds, editor positions,
//! edges, authored envelopes) so hit testing and relinking never touch the
//! audio context. Every change is mirrored locally and sent to the
//! [`Engine`](crate::Engine) as a [`Command`].

use core::f32::consts::{FRAC_PI_2, FRAC_PI_4, TAU};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use rtrb::{Consumer, Producer};
use tracing::{debug, info};

use crate::config::Config;
use crate::engine::{Command, Status};
use crate::envelope::{Envelope, Event};
use crate::error::{EditorError, GraphError};
use crate::node::{Edge, Node, NodeId, NodeMonitor, Slot, TRACKS};
use crate::nodes::NodeKind;
use crate::scope::{ScopeSnapshot, DEFAULT_SCOPE_WIDTH};

/// Height of the toolbar strip along the top of the editor.
pub const TOOLBAR_HEIGHT: f32 = 48.0;

/// Horizontal pitch of toolbar icons.
pub const TOOLBAR_SPACING: f32 = 48.0;

/// A position in editor coordinates (y grows downwards).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Keys the editor reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// Toggle pause.
    Space,
    /// Reset time to 0.
    Rewind,
    /// Show or hide envelope keyframes.
    Envelopes,
    /// Quit.
    Escape,
}

/// What the editor knows about one node.
#[derive(Debug)]
pub struct NodeView {
    pub kind: NodeKind,
    pub position: Point,
    pub edge: Option<Edge>,
    envelopes: [Vec<Event>; TRACKS],
    monitor: Arc<NodeMonitor>,
}

impl NodeView {
    pub fn keyframes(&self, track: usize) -> Option<&[Event]> {
        self.envelopes.get(track).map(Vec::as_slice)
    }
}

/// Input slot for an edge leaving along `(dx, dy)`.
///
/// Four 90° sectors centred on east, south, west and north (screen axes);
/// anything without a direction goes to slot 0.
pub fn slot_for_direction(dx: f32, dy: f32) -> Slot {
    let theta = dy.atan2(dx);
    if !theta.is_finite() {
        return Slot::default();
    }
    let turned = (theta + FRAC_PI_4).rem_euclid(TAU);
    Slot::new((turned / FRAC_PI_2) as usize).unwrap_or_default()
}

/// The graph editor bridge.
pub struct Editor {
    config: Config,
    views: Vec<NodeView>,
    commands: Producer<Command>,
    retired: Consumer<Envelope>,
    status: Arc<Status>,

    paused: bool,
    picked: Option<NodeId>,
    show_envelopes: bool,
    exit_requested: bool,
}

impl Editor {
    pub(crate) fn new(
        config: Config,
        commands: Producer<Command>,
        retired: Consumer<Envelope>,
        status: Arc<Status>,
    ) -> Self {
        Self {
            paused: config.start_paused,
            views: Vec::with_capacity(config.max_nodes),
            config,
            commands,
            retired,
            status,
            picked: None,
            show_envelopes: false,
            exit_requested: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeView> {
        self.views.get(id.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeView)> {
        self.views
            .iter()
            .enumerate()
            .map(|(i, view)| (NodeId::from_index(i), view))
    }

    /// Icon placements for the toolbar, in icon order.
    pub fn toolbar(&self) -> impl Iterator<Item = (NodeKind, Point)> {
        NodeKind::ALL
            .into_iter()
            .map(|kind| (kind, Point::new(32.0 + TOOLBAR_SPACING * kind.icon() as f32, 32.0)))
    }

    // --- queries ---------------------------------------------------------

    /// The first node whose clickable disc contains `(x, y)`.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<NodeId> {
        let at = Point::new(x, y);
        self.views
            .iter()
            .position(|v| v.position.distance(at) < self.config.hit_radius)
            .map(NodeId::from_index)
    }

    /// Closest other node and its distance.
    pub fn nearest(&self, id: NodeId) -> Option<(NodeId, f32)> {
        let from = self.view(id).ok()?.position;
        self.nearest_to(id, from)
    }

    /// Closest node other than `id` to `from`.
    fn nearest_to(&self, id: NodeId, from: Point) -> Option<(NodeId, f32)> {
        self.views
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != id.index())
            .map(|(i, v)| (NodeId::from_index(i), from.distance(v.position)))
            .fold(None, |best: Option<(NodeId, f32)>, candidate| match best {
                Some(b) if b.1 <= candidate.1 => Some(b),
                _ => Some(candidate),
            })
    }

    pub fn scope_snapshot(&self, id: NodeId) -> Option<ScopeSnapshot> {
        self.node(id).map(|v| v.monitor.scope.snapshot())
    }

    /// Latest value of envelope `track` as seen by the audio side.
    pub fn envelope_value(&self, id: NodeId, track: usize) -> Option<f32> {
        if track >= TRACKS {
            return None;
        }
        self.node(id).map(|v| v.monitor.control(track))
    }

    pub fn envelope_keyframes(&self, id: NodeId, track: usize) -> Option<&[Event]> {
        self.node(id)?.keyframes(track)
    }

    pub fn envelope_view(&self) -> bool {
        self.show_envelopes
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn picked(&self) -> Option<NodeId> {
        self.picked
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Offset the audio side reached at the end of its last block.
    pub fn offset(&self) -> u64 {
        self.status.offset.load(Ordering::Relaxed)
    }

    pub fn underflows(&self) -> u64 {
        self.status.underflows.load(Ordering::Relaxed)
    }

    /// Whether the output device failed and rendering stopped.
    pub fn device_failed(&self) -> bool {
        self.status.halted.load(Ordering::Relaxed)
    }

    // --- mutations -------------------------------------------------------

    /// Place a new node at `(x, y)`. It starts unlinked.
    pub fn add_node_at(&mut self, kind: NodeKind, x: f32, y: f32) -> Result<NodeId, EditorError> {
        self.add_node_with_scope(kind, Point::new(x, y), DEFAULT_SCOPE_WIDTH)
    }

    /// Place a new node whose scope shows `scope_width` samples.
    pub fn add_node_with_scope(&mut self, kind: NodeKind, position: Point, scope_width: usize) -> Result<NodeId, EditorError> {
        self.collect_garbage();

        if self.views.len() >= self.config.max_nodes {
            return Err(GraphError::CapacityExceeded {
                capacity: self.config.max_nodes,
            }
            .into());
        }

        let node = Node::new(kind, scope_width);
        let monitor = node.monitor().clone();
        self.send(Command::AddNode(node))?;

        let id = NodeId::from_index(self.views.len());
        self.views.push(NodeView {
            kind,
            position,
            edge: None,
            envelopes: Default::default(),
            monitor,
        });
        debug!(%id, kind = kind.name(), x = position.x, y = position.y, "node placed");
        Ok(id)
    }

    /// Route `from`'s output into `slot` of `to`.
    pub fn connect(&mut self, from: NodeId, to: NodeId, slot: Slot) -> Result<(), EditorError> {
        self.view(to)?;
        self.set_edge(from, Some(Edge::new(to, slot)))
    }

    pub fn disconnect(&mut self, from: NodeId) -> Result<(), EditorError> {
        self.set_edge(from, None)
    }

    /// Move `id` to `(x, y)` and link it to its nearest neighbour if that one
    /// is within the link radius, otherwise unlink it.
    pub fn relink(&mut self, id: NodeId, x: f32, y: f32) -> Result<Option<Edge>, EditorError> {
        let position = Point::new(x, y);
        let current = self.view(id)?.edge;

        let edge = self
            .nearest_to(id, position)
            .filter(|&(_, distance)| distance < self.config.link_radius)
            .and_then(|(to, _)| {
                let target = self.node(to)?.position;
                Some(Edge::new(to, slot_for_direction(target.x - x, target.y - y)))
            });

        // position and edge change together, or not at all
        if current != edge {
            self.set_edge(id, edge)?;
        }
        self.view_mut(id)?.position = position;
        Ok(edge)
    }

    /// Replace envelope `track` of `id` after validating the program.
    pub fn set_envelope(&mut self, id: NodeId, track: usize, events: Vec<Event>) -> Result<(), EditorError> {
        self.collect_garbage();
        self.view(id)?;
        if track >= TRACKS {
            return Err(GraphError::InvalidTrack(track).into());
        }

        let envelope = Envelope::new(events.clone())?;
        self.send(Command::SetEnvelope {
            node: id,
            track,
            envelope,
        })?;
        debug!(%id, track, events = events.len(), "envelope set");
        self.view_mut(id)?.envelopes[track] = events;
        Ok(())
    }

    pub fn toggle_envelope_view(&mut self) -> bool {
        self.show_envelopes = !self.show_envelopes;
        self.show_envelopes
    }

    /// Pause or resume the transport. Returns the new paused state.
    pub fn toggle_pause(&mut self) -> Result<bool, EditorError> {
        let paused = !self.paused;
        self.send(Command::SetPaused(paused))?;
        self.paused = paused;
        info!(paused, "transport toggled");
        Ok(paused)
    }

    /// Reset time to 0.
    pub fn rewind(&mut self) -> Result<(), EditorError> {
        self.send(Command::Rewind)
    }

    // --- gestures --------------------------------------------------------

    pub fn begin_drag(&mut self, id: NodeId) -> Result<(), EditorError> {
        self.view(id)?;
        self.picked = Some(id);
        Ok(())
    }

    pub fn drag_to(&mut self, id: NodeId, x: f32, y: f32) -> Result<Option<Edge>, EditorError> {
        self.relink(id, x, y)
    }

    pub fn end_drag(&mut self) {
        self.picked = None;
    }

    /// Button press. In the toolbar strip this creates the node under the
    /// pointer and picks it up; elsewhere it picks up an existing node.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> Result<Option<NodeId>, EditorError> {
        if y < TOOLBAR_HEIGHT {
            let icon = ((x - 16.0) / TOOLBAR_SPACING).floor();
            let Some(kind) = (icon >= 0.0).then(|| NodeKind::from_icon(icon as usize)).flatten() else {
                return Ok(None);
            };
            let id = self.add_node_at(kind, x, y)?;
            self.picked = Some(id);
            return Ok(Some(id));
        }

        self.picked = self.hit_test(x, y);
        Ok(self.picked)
    }

    /// Pointer motion; drags the picked node, if any.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> Result<(), EditorError> {
        if let Some(id) = self.picked {
            self.drag_to(id, x, y)?;
        }
        Ok(())
    }

    pub fn pointer_up(&mut self) {
        self.end_drag();
    }

    pub fn key(&mut self, key: Key) -> Result<(), EditorError> {
        match key {
            Key::Space => {
                self.toggle_pause()?;
            }
            Key::Rewind => self.rewind()?,
            Key::Envelopes => {
                self.toggle_envelope_view();
            }
            Key::Escape => self.exit_requested = true,
        }
        Ok(())
    }

    /// Free envelopes the audio side has finished with.
    pub fn collect_garbage(&mut self) -> usize {
        let mut freed = 0;
        while self.retired.pop().is_ok() {
            freed += 1;
        }
        freed
    }

    fn set_edge(&mut self, from: NodeId, edge: Option<Edge>) -> Result<(), EditorError> {
        self.view(from)?;
        self.send(Command::SetEdge { node: from, edge })?;
        self.view_mut(from)?.edge = edge;
        debug!(%from, to = ?edge.map(|e| e.to.index()), slot = ?edge.map(|e| e.slot.index()), "edge");
        Ok(())
    }

    fn send(&mut self, command: Command) -> Result<(), EditorError> {
        self.commands.push(command).map_err(|_| EditorError::QueueFull)
    }

    fn view(&self, id: NodeId) -> Result<&NodeView, GraphError> {
        self.views.get(id.index()).ok_or(GraphError::UnknownNode(id))
    }

    fn view_mut(&mut self, id: NodeId) -> Result<&mut NodeView, GraphError> {
        self.views.get_mut(id.index()).ok_or(GraphError::UnknownNode(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    fn editor() -> (Engine, Editor) {
        Engine::new(Config::default().running())
    }

    #[test]
    fn slot_sectors() {
        assert_eq!(slot_for_direction(1.0, 0.0).index(), 0);
        assert_eq!(slot_for_direction(0.0, 1.0).index(), 1);
        assert_eq!(slot_for_direction(-1.0, 0.0).index(), 2);
        assert_eq!(slot_for_direction(0.0, -1.0).index(), 3);
        assert_eq!(slot_for_direction(1.0, -0.9).index(), 0);
        assert_eq!(slot_for_direction(0.0, 0.0).index(), 0);
        assert_eq!(slot_for_direction(f32::NAN, 1.0).index(), 0);
    }

    #[test]
    fn relink_within_radius_attaches() {
        let (_engine, mut ed) = editor();
        let a = ed.add_node_at(NodeKind::Sine, 0.0, 0.0).unwrap();
        let b = ed.add_node_at(NodeKind::Sink, 300.0, 300.0).unwrap();

        let edge = ed.relink(a, 250.0, 300.0).unwrap();
        assert_eq!(edge, Some(Edge::new(b, Slot::new(0).unwrap())));
        assert_eq!(ed.node(a).unwrap().edge, edge);
    }

    #[test]
    fn relink_out_of_radius_clears() {
        let (_engine, mut ed) = editor();
        let a = ed.add_node_at(NodeKind::Sine, 0.0, 0.0).unwrap();
        ed.add_node_at(NodeKind::Sink, 600.0, 0.0).unwrap();

        ed.relink(a, 550.0, 0.0).unwrap();
        assert!(ed.node(a).unwrap().edge.is_some());
        assert_eq!(ed.relink(a, 100.0, 0.0).unwrap(), None);
        assert_eq!(ed.node(a).unwrap().edge, None);
    }

    #[test]
    fn relink_with_full_queue_leaves_node_untouched() {
        let (_engine, mut ed) = Engine::new(Config::default().with_command_capacity(2));
        let a = ed.add_node_at(NodeKind::Sine, 0.0, 0.0).unwrap();
        ed.add_node_at(NodeKind::Sink, 600.0, 0.0).unwrap();

        let err = ed.relink(a, 550.0, 0.0).unwrap_err();
        assert!(matches!(err, EditorError::QueueFull));
        let view = ed.node(a).unwrap();
        assert_eq!(view.position, Point::new(0.0, 0.0));
        assert_eq!(view.edge, None);
    }

    #[test]
    fn lone_node_never_links() {
        let (_engine, mut ed) = editor();
        let a = ed.add_node_at(NodeKind::Square, 0.0, 0.0).unwrap();
        assert_eq!(ed.relink(a, 1.0, 1.0).unwrap(), None);
    }

    #[test]
    fn hit_test_uses_radius() {
        let (_engine, mut ed) = editor();
        let a = ed.add_node_at(NodeKind::Sine, 100.0, 100.0).unwrap();
        assert_eq!(ed.hit_test(110.0, 100.0), Some(a));
        assert_eq!(ed.hit_test(117.0, 100.0), None);
    }

    #[test]
    fn toolbar_press_creates_and_picks() {
        let (_engine, mut ed) = editor();
        // second icon spans x in [64, 112)
        let id = ed.pointer_down(70.0, 20.0).unwrap().unwrap();
        assert_eq!(ed.node(id).unwrap().kind, NodeKind::LowPass);
        assert_eq!(ed.picked(), Some(id));

        ed.pointer_move(400.0, 400.0).unwrap();
        assert_eq!(ed.node(id).unwrap().position, Point::new(400.0, 400.0));
        ed.pointer_up();
        assert_eq!(ed.picked(), None);

        // past the last icon
        assert_eq!(ed.pointer_down(16.0 + 48.0 * 4.0, 20.0).unwrap(), None);
        assert_eq!(ed.pointer_down(2.0, 20.0).unwrap(), None);
    }

    #[test]
    fn capacity_is_enforced_before_sending() {
        let (_engine, mut ed) = Engine::new(Config::default().with_max_nodes(2));
        ed.add_node_at(NodeKind::Sine, 0.0, 0.0).unwrap();
        ed.add_node_at(NodeKind::Sine, 0.0, 0.0).unwrap();

        let err = ed.add_node_at(NodeKind::Sine, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, EditorError::Graph(GraphError::CapacityExceeded { capacity: 2 })));
        assert_eq!(ed.len(), 2);
    }

    #[test]
    fn full_queue_is_reported() {
        let (_engine, mut ed) = Engine::new(Config::default().with_command_capacity(1));
        ed.add_node_at(NodeKind::Sine, 0.0, 0.0).unwrap();

        let err = ed.add_node_at(NodeKind::Sine, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, EditorError::QueueFull));
        assert_eq!(ed.len(), 1);
    }

    #[test]
    fn invalid_envelope_is_rejected_up_front() {
        let (_engine, mut ed) = editor();
        let a = ed.add_node_at(NodeKind::Sine, 0.0, 0.0).unwrap();

        let err = ed.set_envelope(a, 0, vec![Event::Loop { at: 0 }]).unwrap_err();
        assert!(matches!(err, EditorError::Envelope(_)));
        assert!(ed.envelope_keyframes(a, 0).unwrap().is_empty());

        let err = ed.set_envelope(a, 4, vec![]).unwrap_err();
        assert!(matches!(err, EditorError::Graph(GraphError::InvalidTrack(4))));
    }

    #[test]
    fn keys_drive_transport_and_view() {
        let (_engine, mut ed) = Engine::new(Config::default());
        assert!(ed.is_paused());

        ed.key(Key::Space).unwrap();
        assert!(!ed.is_paused());
        assert!(ed.key(Key::Envelopes).is_ok());
        assert!(ed.envelope_view());
        ed.key(Key::Escape).unwrap();
        assert!(ed.exit_requested());
    }

    #[test]
    fn toolbar_layout() {
        let (_engine, ed) = editor();
        let icons: Vec<_> = ed.toolbar().collect();
        assert_eq!(icons.len(), 4);
        assert_eq!(icons[3], (NodeKind::Sine, Point::new(176.0, 32.0)));
    }
}
