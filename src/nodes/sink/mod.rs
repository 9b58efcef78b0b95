//! The audible output.

use crate::node::Controls;

/// Slot 0 is what the listener hears.
#[inline]
pub fn audible(inputs: &Controls) -> f32 {
    inputs[0]
}
