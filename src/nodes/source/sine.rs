use core::f64::consts::TAU;

use crate::node::{Controls, ProcessContext};

/// `sin(2π · f · t)` with `f` taken from slot 0.
#[inline]
pub fn sine(inputs: &Controls, t: u64, ctx: &ProcessContext) -> f32 {
    let frequency = ctx.frequency(inputs[0]);
    (super::phase(frequency, ctx.seconds(t)) * TAU).sin() as f32
}
