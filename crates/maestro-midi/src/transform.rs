//! Sequence-level transforms: merge, transpose, slice, random generation.

use crate::note::{Note, Ticks, MIDI_MAX};
use crate::sequence::Sequence;
use rand::Rng;
use std::ops::RangeInclusive;

/// Notes at or below this velocity after weighting are dropped by
/// [`merge_sequences`].
pub const MIN_AUDIBLE_VELOCITY: u8 = 10;

/// Blend two sequences.
///
/// Velocities of `a` are scaled by `weight_a`, those of `b` by
/// `1 - weight_a` (weight clamped to `[0, 1]`). Notes that end up at or
/// below [`MIN_AUDIBLE_VELOCITY`] are dropped, and the result is sorted by
/// start tick. Resolution and meter come from `a`.
pub fn merge_sequences(a: &Sequence, b: &Sequence, weight_a: f32) -> Sequence {
    let weight_a = if weight_a.is_finite() {
        weight_a.clamp(0.0, 1.0)
    } else {
        0.5
    };
    let weight_b = 1.0 - weight_a;

    let weighted = |notes: &[Note], weight: f32| -> Vec<Note> {
        notes
            .iter()
            .filter_map(|note| {
                let velocity = (note.velocity as f32 * weight) as u8;
                (velocity > MIN_AUDIBLE_VELOCITY).then(|| note.with_velocity(velocity))
            })
            .collect()
    };

    let mut result = Sequence::new(a.ticks_per_quarter, a.total_ticks.max(b.total_ticks))
        .with_time_signature(a.time_signature);
    result.notes = weighted(&a.notes, weight_a);
    result.notes.extend(weighted(&b.notes, weight_b));
    result.sort_by_start();
    result.fit_to_notes();
    result
}

/// Shift every pitch by `semitones`; notes leaving 0-127 are dropped.
pub fn transpose_sequence(sequence: &Sequence, semitones: i32) -> Sequence {
    let notes = sequence
        .notes
        .iter()
        .filter_map(|note| {
            let pitch = note.pitch as i32 + semitones;
            (0..=MIDI_MAX as i32).contains(&pitch).then(|| Note {
                pitch: pitch as u8,
                ..*note
            })
        })
        .collect();
    sequence.with_same_context(notes)
}

/// Notes starting in `[start, end)`, re-based to tick 0.
///
/// Durations are cut at `end`. The result is exactly `end - start` ticks
/// long; an empty or inverted range yields an empty one-tick sequence.
pub fn extract_subsequence(sequence: &Sequence, start: Ticks, end: Ticks) -> Sequence {
    let length = end.saturating_sub(start);
    let notes = sequence
        .notes
        .iter()
        .filter(|note| note.start_tick >= start && note.start_tick < end)
        .map(|note| Note {
            start_tick: note.start_tick - start,
            duration: note.duration.min(end - note.start_tick),
            ..*note
        })
        .collect();

    let mut result = Sequence::new(sequence.ticks_per_quarter, length)
        .with_time_signature(sequence.time_signature);
    result.notes = notes;
    result
}

/// Random notes for auditioning and tests.
///
/// Velocity is drawn from 60-100 and duration from 120-480 ticks, cut so no
/// note runs past `total_ticks`. Output is sorted by start tick at 480 PPQ.
pub fn random_sequence<R: Rng>(
    rng: &mut R,
    count: usize,
    total_ticks: Ticks,
    pitch_range: RangeInclusive<u8>,
    is_percussion: bool,
) -> Sequence {
    let total_ticks = total_ticks.max(1);
    let low = (*pitch_range.start()).min(MIDI_MAX);
    let high = (*pitch_range.end()).clamp(low, MIDI_MAX);

    let mut sequence = Sequence::new(crate::DEFAULT_TICKS_PER_QUARTER, total_ticks);
    sequence.notes = (0..count)
        .map(|_| {
            let start = rng.gen_range(0..total_ticks);
            let duration = rng.gen_range(120..=480u32).min(total_ticks - start);
            let mut note = Note::new(
                rng.gen_range(low..=high),
                rng.gen_range(60..=100),
                start,
                duration,
            );
            note.is_percussion = is_percussion;
            note
        })
        .collect();
    sequence.sort_by_start();
    sequence
}
