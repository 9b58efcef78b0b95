//! Engine configuration.
//!
//! Everything here is compiled in; there is no configuration file. Use
//! [`Config::default`] and the `with_*` setters to override individual values:
//!
//! ```
//! use patchwire::Config;
//!
//! let config = Config::default()
//!     .with_sample_rate(48_000)
//!     .with_max_nodes(64);
//! assert_eq!(config.sample_rate, 48_000);
//! ```

use std::time::Duration;

use crate::node::ProcessContext;

/// Sample rate the built-in patches are authored for.
pub const DEFAULT_SAMPLE_RATE: u32 = 96_000;

/// Frequency of a control input of `0.0` (one octave per unit).
pub const DEFAULT_BASE_FREQUENCY: f32 = 440.0;

/// Size of the node table.
pub const DEFAULT_MAX_NODES: usize = 1024;

/// Engine-wide settings shared by the audio and editor sides.
#[derive(Clone, Debug)]
pub struct Config {
    /// Output sample rate in Hz. Affects every frequency and time conversion.
    pub sample_rate: u32,
    /// Frequency in Hz that a pitch/cutoff control value of `0.0` maps to.
    pub base_frequency: f32,
    /// Maximum number of nodes in the graph.
    pub max_nodes: usize,
    /// Maximum editor distance at which a dragged node links to its nearest neighbour.
    pub link_radius: f32,
    /// Radius of a node's clickable area in the editor.
    pub hit_radius: f32,
    /// Capacity of the editor → audio command queue.
    pub command_capacity: usize,
    /// Whether the transport starts paused (corked).
    pub start_paused: bool,
    /// How long to wait for the output device before giving up.
    pub ready_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            base_frequency: DEFAULT_BASE_FREQUENCY,
            max_nodes: DEFAULT_MAX_NODES,
            link_radius: 200.0,
            hit_radius: 16.0,
            command_capacity: 256,
            start_paused: true,
            ready_timeout: Duration::from_secs(2),
        }
    }
}

impl Config {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
    }

    pub fn with_base_frequency(mut self, base_frequency: f32) -> Self {
        self.base_frequency = base_frequency;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_link_radius(mut self, radius: f32) -> Self {
        self.link_radius = radius;
        self
    }

    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }

    /// Start with the transport running instead of corked.
    pub fn running(mut self) -> Self {
        self.start_paused = false;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// The subset of the configuration node functions see on every sample.
    pub fn process_context(&self) -> ProcessContext {
        ProcessContext {
            sample_rate: self.sample_rate,
            base_frequency: self.base_frequency,
        }
    }
}
