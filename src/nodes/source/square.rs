use crate::node::{Controls, ProcessContext};

/// `+1` while `floor(t · f)` is even, `-1` otherwise.
#[inline]
pub fn square(inputs: &Controls, t: u64, ctx: &ProcessContext) -> f32 {
    let frequency = ctx.frequency(inputs[0]) as f64;
    let cycles = (ctx.seconds(t) * frequency).floor();
    if cycles.rem_euclid(2.0) < 1.0 {
        1.0
    } else {
        -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternates_every_half_period() {
        let ctx = ProcessContext {
            sample_rate: 1_000,
            base_frequency: 50.0,
        };
        // floor(t * 50 / 1000) changes every 20 samples
        let out: Vec<f32> = [0, 19, 20, 39, 40].iter().map(|&t| square(&[0.0; 4], t, &ctx)).collect();
        assert_eq!(out, vec![1.0, 1.0, -1.0, -1.0, 1.0]);
    }

    #[test]
    fn output_is_always_unit() {
        let ctx = ProcessContext {
            sample_rate: 96_000,
            base_frequency: 440.0,
        };
        for t in (0..96_000).step_by(97) {
            assert_eq!(square(&[0.3, 0.0, 0.0, 0.0], t, &ctx).abs(), 1.0);
        }
    }
}
