//! Groove and swing timing transforms.

use crate::note::{Note, Ticks};
use crate::sequence::Sequence;

/// Fixed-length timing/velocity deviation profile.
///
/// Values are in quarter notes: `0.1` pushes a note a tenth of a beat late.
pub type GrooveVector = Vec<f32>;

/// Shift each note by the groove value of the step it starts in.
///
/// The sequence is split into `groove.len()` equal steps; a note in step
/// `i` moves by `groove[i] * ticks_per_quarter` ticks, never before tick 0.
/// An empty groove or an all-zero groove returns the input unchanged.
pub fn apply_groove_timing(sequence: &Sequence, groove: &[f32]) -> Sequence {
    if groove.is_empty() || sequence.is_empty() {
        return sequence.clone();
    }

    let steps = groove.len();
    let step_len = (sequence.total_ticks as f64 / steps as f64).max(1.0);
    let tpq = sequence.ticks_per_quarter as f64;

    let notes = sequence
        .notes
        .iter()
        .map(|note| {
            let step = (note.start_tick as f64 / step_len) as usize % steps;
            let amount = groove[step];
            if !amount.is_finite() || amount == 0.0 {
                return *note;
            }
            let offset = (amount as f64 * tpq).round() as i64;
            Note {
                start_tick: offset_tick(note.start_tick, offset),
                ..*note
            }
        })
        .collect();

    sequence.with_same_context(notes)
}

/// Delay off-beat eighth notes.
///
/// Notes starting on the second eighth of each beat (eighth index 1, 3, 5,
/// ...) move later by `amount * eighth / 2` ticks. `amount` is clamped to
/// `[0, 1]`.
pub fn apply_swing(sequence: &Sequence, amount: f32) -> Sequence {
    let amount = if amount.is_finite() {
        amount.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let eighth = (sequence.ticks_per_quarter / 2).max(1);
    let offset = (amount as f64 * eighth as f64 / 2.0).round() as Ticks;
    if offset == 0 {
        return sequence.clone();
    }

    let notes = sequence
        .notes
        .iter()
        .map(|note| {
            if (note.start_tick / eighth) % 2 == 1 {
                note.with_start(note.start_tick.saturating_add(offset))
            } else {
                *note
            }
        })
        .collect();

    sequence.with_same_context(notes)
}

#[inline]
fn offset_tick(tick: Ticks, offset: i64) -> Ticks {
    (tick as i64).saturating_add(offset).clamp(0, Ticks::MAX as i64) as Ticks
}
