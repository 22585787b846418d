//! Ordered note collections with timing context.

use crate::note::{Note, Ticks};
use serde::{Deserialize, Serialize};

/// Default sequencer resolution (pulses per quarter note).
pub const DEFAULT_TICKS_PER_QUARTER: Ticks = 480;

/// Musical meter, e.g. 4/4 or 6/8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    pub const COMMON: TimeSignature = TimeSignature::new(4, 4);

    pub const fn new(numerator: u8, denominator: u8) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Length of one bar in ticks at the given resolution.
    pub fn bar_ticks(&self, ticks_per_quarter: Ticks) -> Ticks {
        let denominator = self.denominator.max(1) as u64;
        let ticks = ticks_per_quarter as u64 * 4 * self.numerator.max(1) as u64 / denominator;
        ticks.clamp(1, Ticks::MAX as u64) as Ticks
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::COMMON
    }
}

/// A clip of notes.
///
/// Note order is the caller's chronological intent and is not enforced.
/// `total_ticks` bounds the tick range used for tensor normalization;
/// transforms grow it to fit their output rather than truncating notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub notes: Vec<Note>,
    pub ticks_per_quarter: Ticks,
    pub total_ticks: Ticks,
    #[serde(default)]
    pub time_signature: TimeSignature,
}

impl Sequence {
    /// Empty sequence. Zero resolution or length is raised to 1.
    pub fn new(ticks_per_quarter: Ticks, total_ticks: Ticks) -> Self {
        Self {
            notes: Vec::new(),
            ticks_per_quarter: ticks_per_quarter.max(1),
            total_ticks: total_ticks.max(1),
            time_signature: TimeSignature::COMMON,
        }
    }

    /// Empty sequence `bars` bars of 4/4 long.
    pub fn with_bars(ticks_per_quarter: Ticks, bars: u32) -> Self {
        let tpq = ticks_per_quarter.max(1);
        Self::new(tpq, tpq.saturating_mul(4).saturating_mul(bars.max(1)))
    }

    pub fn with_notes(mut self, notes: impl IntoIterator<Item = Note>) -> Self {
        self.notes.extend(notes);
        self.fit_to_notes();
        self
    }

    pub fn with_time_signature(mut self, time_signature: TimeSignature) -> Self {
        self.time_signature = time_signature;
        self
    }

    /// Append a note, growing `total_ticks` if the note runs past the end.
    pub fn push(&mut self, note: Note) {
        self.notes.push(note);
        self.total_ticks = self.total_ticks.max(note.end_tick());
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Latest note end, or 0 for an empty sequence.
    pub fn last_end_tick(&self) -> Ticks {
        self.notes.iter().map(Note::end_tick).max().unwrap_or(0)
    }

    /// Grow `total_ticks` so that every note lies inside the sequence.
    pub fn fit_to_notes(&mut self) {
        self.total_ticks = self.total_ticks.max(self.last_end_tick()).max(1);
    }

    /// Same timing context, different notes.
    pub(crate) fn with_same_context(&self, notes: Vec<Note>) -> Self {
        let mut out = Self {
            notes,
            ticks_per_quarter: self.ticks_per_quarter,
            total_ticks: self.total_ticks,
            time_signature: self.time_signature,
        };
        out.fit_to_notes();
        out
    }

    /// Stable sort by start tick.
    pub fn sort_by_start(&mut self) {
        self.notes.sort_by_key(|n| n.start_tick);
    }
}

impl Default for Sequence {
    /// One bar of 4/4 at 480 PPQ.
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_PER_QUARTER, DEFAULT_TICKS_PER_QUARTER * 4)
    }
}
