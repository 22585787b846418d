//! Note/tensor codec.
//!
//! Each note becomes a fixed-width record of five floats:
//! `[pitch, velocity, start, duration, percussion]`. Pitch and velocity are
//! normalized over 0-127, start and duration over the sequence length, and
//! the percussion flag is `0.0` or `1.0`.

use crate::note::{Note, Ticks, MIDI_MAX};
use crate::sequence::Sequence;

/// Floats per note record.
pub const NOTE_RECORD_WIDTH: usize = 5;

/// Map `value` from `[min, max]` onto `[0, 1]`. A degenerate range maps to 0.5.
#[inline]
pub fn normalize(value: f32, min: f32, max: f32) -> f32 {
    if max == min {
        return 0.5;
    }
    (value - min) / (max - min)
}

/// Inverse of [`normalize`].
#[inline]
pub fn denormalize(value: f32, min: f32, max: f32) -> f32 {
    min + value * (max - min)
}

/// Encode a sequence as a flat tensor, one record per note in order.
pub fn sequence_to_tensor(sequence: &Sequence) -> Vec<f32> {
    let total = sequence.total_ticks.max(1) as f64;
    let mut tensor = Vec::with_capacity(sequence.notes.len() * NOTE_RECORD_WIDTH);

    for note in &sequence.notes {
        tensor.push(normalize(note.pitch as f32, 0.0, MIDI_MAX as f32));
        tensor.push(normalize(note.velocity as f32, 0.0, MIDI_MAX as f32));
        tensor.push((note.start_tick as f64 / total) as f32);
        tensor.push((note.duration as f64 / total) as f32);
        tensor.push(if note.is_percussion { 1.0 } else { 0.0 });
    }

    tensor
}

/// Decode a tensor produced by a model into a sequence.
///
/// Time fractions are scaled by one 4/4 bar (`4 * ticks_per_quarter`).
/// See [`tensor_to_sequence_scaled`].
pub fn tensor_to_sequence(tensor: &[f32], ticks_per_quarter: Ticks) -> Sequence {
    let tpq = ticks_per_quarter.max(1);
    tensor_to_sequence_scaled(tensor, tpq, tpq.saturating_mul(4))
}

/// Decode a tensor against an explicit reference length.
///
/// `total_ticks` of the result is the reference length times the ceiling of
/// the largest `start + duration` fraction seen (at least one), so no decoded
/// note exceeds the sequence bounds. A trailing partial record is ignored.
pub fn tensor_to_sequence_scaled(
    tensor: &[f32],
    ticks_per_quarter: Ticks,
    reference_ticks: Ticks,
) -> Sequence {
    let reference = reference_ticks.max(1) as f64;
    let mut notes = Vec::with_capacity(tensor.len() / NOTE_RECORD_WIDTH);
    let mut max_end_fraction = 0.0_f64;

    for record in tensor.chunks_exact(NOTE_RECORD_WIDTH) {
        // f64::max drops NaN, so garbage timing decodes as zero.
        let start_fraction = (record[2] as f64).max(0.0);
        let duration_fraction = (record[3] as f64).max(0.0);

        let start_tick = to_ticks(start_fraction * reference);
        let duration = to_ticks(duration_fraction * reference).max(1);

        notes.push(Note {
            pitch: to_midi(record[0]),
            velocity: to_midi(record[1]),
            start_tick,
            duration,
            is_percussion: record[4] > 0.5,
        });

        max_end_fraction = max_end_fraction.max(start_fraction + duration_fraction);
    }

    let bars = max_end_fraction.ceil().max(1.0);
    let mut sequence = Sequence::new(ticks_per_quarter, to_ticks(bars * reference));
    sequence.notes = notes;
    sequence.fit_to_notes();
    sequence
}

#[inline]
fn to_midi(normalized: f32) -> u8 {
    let value = denormalize(normalized, 0.0, MIDI_MAX as f32).round();
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, MIDI_MAX as f32) as u8
}

#[inline]
fn to_ticks(value: f64) -> Ticks {
    // `as` saturates on overflow and maps NaN to 0.
    value.round() as Ticks
}
