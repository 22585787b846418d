//! Note value type.
//!
//! # Example
//! ```ignore
//! use maestro_midi::Note;
//!
//! let kick = Note::new(36, 110, 0, 120).percussion();
//! assert_eq!(kick.end_tick(), 120);
//! ```

use serde::{Deserialize, Serialize};

/// Position or length in sequencer ticks.
pub type Ticks = u32;

/// Highest MIDI pitch/velocity value.
pub const MIDI_MAX: u8 = 127;

/// A single musical event.
///
/// Pitch and velocity are MIDI values (0-127). `duration` is always at
/// least one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub pitch: u8,
    pub velocity: u8,
    pub start_tick: Ticks,
    pub duration: Ticks,
    #[serde(default)]
    pub is_percussion: bool,
}

impl Note {
    /// Pitch and velocity are clamped to 0-127, duration to at least 1.
    #[inline]
    pub fn new(pitch: u8, velocity: u8, start_tick: Ticks, duration: Ticks) -> Self {
        Self {
            pitch: pitch.min(MIDI_MAX),
            velocity: velocity.min(MIDI_MAX),
            start_tick,
            duration: duration.max(1),
            is_percussion: false,
        }
    }

    /// Mark the note as a drum hit.
    #[inline]
    pub fn percussion(mut self) -> Self {
        self.is_percussion = true;
        self
    }

    /// First tick after the note ends.
    #[inline]
    pub fn end_tick(&self) -> Ticks {
        self.start_tick.saturating_add(self.duration)
    }

    #[inline]
    pub fn with_start(mut self, start_tick: Ticks) -> Self {
        self.start_tick = start_tick;
        self
    }

    #[inline]
    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity.min(MIDI_MAX);
        self
    }
}

impl Default for Note {
    /// Middle C, mezzo-forte, one quarter note at 480 PPQ.
    fn default() -> Self {
        Self::new(60, 64, 0, 480)
    }
}
