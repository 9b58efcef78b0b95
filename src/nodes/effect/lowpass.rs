use core::f32::consts::TAU;

use crate::node::{Controls, ProcessContext};

/// One-pole RC low-pass.
///
/// Slot 0 is the signal, slot 1 the cutoff in octaves above the base
/// frequency. `state` holds the previous output.
#[inline]
pub fn lowpass(state: &mut f32, inputs: &Controls, ctx: &ProcessContext) -> f32 {
    let rc = 1.0 / (TAU * ctx.frequency(inputs[1]));
    let dt = ctx.dt();
    let alpha = dt / (rc + dt);

    *state = alpha * inputs[0] + (1.0 - alpha) * *state;
    *state
}
