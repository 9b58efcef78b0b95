//! Oscillators. Both are pure functions of time and pitch, so they carry no state.

mod sine;
mod square;

pub use sine::sine;
pub use square::square;

/// Cycles elapsed at `t`, wrapped to `[0, 1)`.
///
/// Computed in `f64` so phase stays accurate after hours of playback.
#[inline]
fn phase(frequency: f32, seconds: f64) -> f64 {
    (seconds * frequency as f64).fract()
}
