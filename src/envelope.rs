//! Time-keyed automation tracks.
//!
//! An [`Envelope`] is a short program of keyed events, evaluated once per
//! sample by the scheduler. Positions are sample offsets from the start of the
//! current loop epoch:
//!
//! - [`Event::Set`] changes the output value once its position is reached.
//! - [`Event::Loop`] moves the epoch forward by its position and restarts the
//!   program from the first event, giving a cycle of that length.
//! - [`Event::End`] freezes the output for good.
//!
//! ```
//! use patchwire::envelope::{Envelope, Event};
//!
//! let mut env = Envelope::new(vec![
//!     Event::Set { at: 0, value: 1.0 },
//!     Event::Set { at: 4, value: -1.0 },
//!     Event::Loop { at: 8 },
//! ]).unwrap();
//!
//! assert_eq!(env.advance(0), 1.0);
//! assert_eq!(env.advance(5), -1.0);
//! assert_eq!(env.advance(9), 1.0); // second cycle
//! ```
//!
//! The evaluator keeps its scan position between calls, so walking forward one
//! sample at a time costs O(1) amortised. Time is expected to be
//! non-decreasing between [`Envelope::reset`]s.

use itertools::Itertools;

use crate::error::EnvelopeError;

/// One keyed command of an envelope program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    /// Output `value` from sample `at` on.
    Set { at: u64, value: f32 },
    /// Restart the program; the cycle is `at` samples long.
    Loop { at: u64 },
    /// Hold the current value forever.
    End { at: u64 },
}

impl Event {
    /// Position of the event relative to its loop epoch.
    pub fn position(&self) -> u64 {
        match *self {
            Event::Set { at, .. } | Event::Loop { at } | Event::End { at } => at,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Event::Loop { .. } | Event::End { .. })
    }
}

/// An automation track with its playback state.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    events: Vec<Event>,

    /// Index of the next event to apply
    cursor: usize,
    /// Global offset at which the current loop cycle started
    epoch: u64,
    value: f32,
    /// Index of the last event applied, for highlighting in the editor
    marker: Option<usize>,
    halted: bool,
}

impl Envelope {
    /// Build an envelope from an event list, rejecting programs with
    /// undefined timing.
    pub fn new(events: Vec<Event>) -> Result<Self, EnvelopeError> {
        validate(&events)?;
        Ok(Self {
            events,
            ..Self::default()
        })
    }

    /// An envelope that outputs `value` from the first sample on.
    pub fn constant(value: f32) -> Self {
        Self {
            events: vec![Event::Set { at: 0, value }],
            ..Self::default()
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The value produced by the most recent [`advance`](Self::advance).
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Index of the most recently applied `Set` or `End` event.
    pub fn marker(&self) -> Option<usize> {
        self.marker
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Rewind to the state of a freshly built envelope.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.epoch = 0;
        self.value = 0.0;
        self.marker = None;
        self.halted = false;
    }

    /// Advance to global sample offset `t` and return the current value.
    pub fn advance(&mut self, t: u64) -> f32 {
        if self.halted {
            return self.value;
        }

        while let Some(&event) = self.events.get(self.cursor) {
            let due = self.epoch.saturating_add(event.position());
            if due > t {
                break;
            }

            match event {
                Event::Set { value, .. } => {
                    self.value = value;
                    self.marker = Some(self.cursor);
                    self.cursor += 1;
                }
                Event::Loop { at } => {
                    if at == 0 {
                        // unreachable: `Envelope::new` rejects `Loop(0)` and `events` is private
                        self.halted = true;
                        break;
                    }
                    self.epoch = due;
                    // Every cycle ends in the same state, so whole cycles
                    // lying before `t` can be skipped.
                    let behind = t - self.epoch;
                    if behind >= at {
                        self.epoch += behind / at * at;
                    }
                    self.cursor = 0;
                }
                Event::End { .. } => {
                    self.marker = Some(self.cursor);
                    self.halted = true;
                    break;
                }
            }
        }

        self.value
    }
}

fn validate(events: &[Event]) -> Result<(), EnvelopeError> {
    if let Some(index) = events.iter().position(|e| matches!(e, Event::Loop { at: 0 })) {
        return Err(EnvelopeError::ZeroLengthLoop { index });
    }

    if let Some(index) = events.iter().position(Event::is_terminal) {
        if index + 1 < events.len() {
            return Err(EnvelopeError::UnreachableEvent { index: index + 1 });
        }
    }

    for ((_, prev), (index, event)) in events.iter().enumerate().tuple_windows() {
        if event.position() < prev.position() {
            return Err(EnvelopeError::NonMonotonic {
                index,
                position: event.position(),
                previous: prev.position(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: u64 = 96_000;

    fn square_lfo() -> Envelope {
        Envelope::new(vec![
            Event::Set { at: 0, value: 1.0 },
            Event::Set { at: SECOND, value: -1.0 },
            Event::Loop { at: 2 * SECOND },
        ])
        .unwrap()
    }

    #[test]
    fn empty_envelope_is_zero() {
        let mut env = Envelope::default();
        for t in [0, 1, 1_000, SECOND * 100] {
            assert_eq!(env.advance(t), 0.0);
        }
    }

    #[test]
    fn set_events_apply_at_their_position() {
        let mut env = square_lfo();
        assert_eq!(env.advance(0), 1.0);
        assert_eq!(env.advance(SECOND - 1), 1.0);
        assert_eq!(env.advance(SECOND), -1.0);
        assert_eq!(env.marker(), Some(1));
    }

    #[test]
    fn loop_repeats_with_its_period() {
        let mut walked = square_lfo();
        let mut history = Vec::with_capacity((2 * SECOND) as usize);

        for t in 0..2 * SECOND {
            history.push(walked.advance(t));
        }
        for t in 2 * SECOND..5 * SECOND {
            let v = walked.advance(t);
            assert_eq!(v, history[(t % (2 * SECOND)) as usize], "mismatch at t={t}");
        }
    }

    #[test]
    fn sparse_sampling_matches_periodicity() {
        for k in [0, 1, SECOND - 1, SECOND, SECOND + 17, 2 * SECOND - 1] {
            let mut a = square_lfo();
            let mut b = square_lfo();
            assert_eq!(a.advance(k), b.advance(2 * SECOND + k), "k={k}");
        }
    }

    #[test]
    fn large_jump_skips_whole_cycles() {
        let mut env = square_lfo();
        let t = 2 * SECOND * 1_000_000 + SECOND + 3;
        assert_eq!(env.advance(t), -1.0);
        assert_eq!(env.advance(t + SECOND), 1.0);
    }

    #[test]
    fn end_freezes_value() {
        let mut env = Envelope::new(vec![
            Event::Set { at: 0, value: 0.25 },
            Event::Set { at: 10, value: 0.5 },
            Event::End { at: 20 },
        ])
        .unwrap();

        assert_eq!(env.advance(15), 0.5);
        assert_eq!(env.advance(20), 0.5);
        assert!(env.is_halted());
        assert_eq!(env.advance(u64::MAX), 0.5);
        assert_eq!(env.marker(), Some(2));
    }

    #[test]
    fn value_before_first_set_is_zero() {
        let mut env = Envelope::new(vec![Event::Set { at: 100, value: 3.0 }]).unwrap();
        assert_eq!(env.advance(99), 0.0);
        assert_eq!(env.advance(100), 3.0);
    }

    #[test]
    fn reset_restarts_program() {
        let mut env = square_lfo();
        env.advance(3 * SECOND);
        env.reset();
        assert_eq!(env.value(), 0.0);
        assert_eq!(env.marker(), None);
        assert_eq!(env.advance(0), 1.0);
    }

    #[test]
    fn rejects_zero_length_loop() {
        let err = Envelope::new(vec![Event::Set { at: 0, value: 1.0 }, Event::Loop { at: 0 }]).unwrap_err();
        assert_eq!(err, EnvelopeError::ZeroLengthLoop { index: 1 });
    }

    #[test]
    fn rejects_decreasing_positions() {
        let err = Envelope::new(vec![
            Event::Set { at: 50, value: 1.0 },
            Event::Set { at: 10, value: 2.0 },
        ])
        .unwrap_err();
        assert_eq!(
            err,
            EnvelopeError::NonMonotonic {
                index: 1,
                position: 10,
                previous: 50
            }
        );
    }

    #[test]
    fn rejects_events_after_terminator() {
        let err = Envelope::new(vec![Event::End { at: 5 }, Event::Set { at: 6, value: 1.0 }]).unwrap_err();
        assert_eq!(err, EnvelopeError::UnreachableEvent { index: 1 });
    }

    #[test]
    fn constant_holds_value() {
        let mut env = Envelope::constant(-0.5);
        assert_eq!(env.advance(0), -0.5);
        assert_eq!(env.advance(SECOND), -0.5);
    }
}
