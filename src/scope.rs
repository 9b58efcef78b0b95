//! Oscilloscope history for the editor.
//!
//! The scheduler is the only writer; the editor copies a [`ScopeSnapshot`]
//! whenever it redraws. Reads may be a few samples stale, which is fine for a
//! picture.

use std::sync::atomic::{AtomicI8, AtomicUsize, Ordering};

/// Number of entries backing every scope.
pub const SCOPE_CAPACITY: usize = 1024;

/// Display width given to nodes placed from the toolbar.
pub const DEFAULT_SCOPE_WIDTH: usize = 860;

/// Ring buffer of recent output samples scaled to `i8`.
#[derive(Debug)]
pub struct Scope {
    samples: Box<[AtomicI8]>,
    /// Total number of samples pushed (wrapping)
    cursor: AtomicUsize,
    width: usize,
}

impl Scope {
    /// A scope showing the last `width` samples (clamped to `1..=SCOPE_CAPACITY`).
    pub fn new(width: usize) -> Self {
        Self {
            samples: (0..SCOPE_CAPACITY).map(|_| AtomicI8::new(0)).collect(),
            cursor: AtomicUsize::new(0),
            width: width.clamp(1, SCOPE_CAPACITY),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Record one output sample. Audio context only.
    #[inline]
    pub fn push(&self, sample: f32) {
        // saturating float -> int cast
        let scaled = (127.0 * sample).round() as i8;
        let pos = self.cursor.load(Ordering::Relaxed);
        self.samples[pos % self.width].store(scaled, Ordering::Relaxed);
        self.cursor.store(pos.wrapping_add(1), Ordering::Release);
    }

    /// Copy out the visible part of the ring.
    pub fn snapshot(&self) -> ScopeSnapshot {
        let cursor = self.cursor();
        ScopeSnapshot {
            samples: self.samples[..self.width]
                .iter()
                .map(|s| s.load(Ordering::Relaxed))
                .collect(),
            cursor,
            width: self.width,
        }
    }
}

/// A point-in-time copy of a [`Scope`].
#[derive(Clone, Debug, PartialEq)]
pub struct ScopeSnapshot {
    /// Ring contents in storage order; `samples[cursor % width]` is the oldest.
    pub samples: Vec<i8>,
    pub cursor: usize,
    pub width: usize,
}

impl ScopeSnapshot {
    /// Fraction of the ring the write position has scrolled through, in `[0, 1)`.
    pub fn shift(&self) -> f32 {
        (self.cursor % self.width) as f32 / self.width as f32
    }

    /// The most recently written sample, if anything was written.
    pub fn latest(&self) -> Option<i8> {
        if self.cursor == 0 {
            return None;
        }
        Some(self.samples[(self.cursor - 1) % self.width])
    }

    /// Samples from oldest to newest.
    pub fn chronological(&self) -> impl Iterator<Item = i8> + '_ {
        let start = self.cursor % self.width;
        self.samples[start..].iter().chain(&self.samples[..start]).copied()
    }
}
