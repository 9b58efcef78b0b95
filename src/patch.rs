//! The patch loaded at startup.

use tracing::info;

use crate::config::Config;
use crate::editor::{Editor, Point};
use crate::engine::Engine;
use crate::envelope::Event;
use crate::error::EditorError;
use crate::node::Slot;
use crate::nodes::NodeKind;

/// Scope width of the demo sink.
pub const DEMO_SINK_SCOPE: usize = 256;

/// Pitch program for the demo square: 0 → ½ → 1 octave over half a second,
/// repeating every second.
pub fn demo_pitch(sample_rate: u32) -> Vec<Event> {
    let sr = sample_rate as u64;
    vec![
        Event::Set { at: 0, value: 0.0 },
        Event::Set { at: sr / 4, value: 0.5 },
        Event::Set { at: sr / 2, value: 1.0 },
        Event::Loop { at: sr },
    ]
}

/// Build `square → low-pass → sink` and apply it to the engine.
///
/// ```
/// use patchwire::{patch, Config};
///
/// let (engine, editor) = patch::demo(Config::default()).unwrap();
/// assert_eq!(engine.graph().len(), 3);
/// assert_eq!(editor.len(), 3);
/// ```
pub fn demo(config: Config) -> Result<(Engine, Editor), EditorError> {
    let sample_rate = config.sample_rate;
    let (mut engine, mut editor) = Engine::new(config);

    let sink = editor.add_node_with_scope(NodeKind::Sink, Point::new(100.0, 100.0), DEMO_SINK_SCOPE)?;
    let square = editor.add_node_at(NodeKind::Square, 200.0, 200.0)?;
    let filter = editor.add_node_at(NodeKind::LowPass, 300.0, 250.0)?;

    editor.connect(square, filter, Slot::ALL[0])?;
    editor.connect(filter, sink, Slot::ALL[0])?;
    editor.set_envelope(square, 0, demo_pitch(sample_rate))?;

    engine.apply_pending();
    info!(nodes = engine.graph().len(), sample_rate, "demo patch loaded");
    Ok((engine, editor))
}
