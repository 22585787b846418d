//! Musical feature vectors and sequence similarity.

use crate::sequence::Sequence;

pub const PITCH_BINS: usize = 128;
pub const RHYTHM_BINS: usize = 16;
pub const VELOCITY_BINS: usize = 16;

/// Length of the vector returned by [`extract_features`].
pub const FEATURE_LEN: usize = PITCH_BINS + RHYTHM_BINS + VELOCITY_BINS + 1;

/// Fixed-length description of a sequence.
///
/// Layout: pitch histogram (128), onset-position histogram (16), velocity
/// histogram (16), note density (`notes / total_ticks`). Histograms are
/// normalized by note count. An empty sequence yields all zeros.
pub fn extract_features(sequence: &Sequence) -> Vec<f32> {
    let mut features = vec![0.0_f32; FEATURE_LEN];
    if sequence.is_empty() {
        return features;
    }

    let total_ticks = sequence.total_ticks.max(1) as u64;
    let (pitch, rest) = features.split_at_mut(PITCH_BINS);
    let (rhythm, rest) = rest.split_at_mut(RHYTHM_BINS);
    let (velocity, density) = rest.split_at_mut(VELOCITY_BINS);

    for note in &sequence.notes {
        pitch[note.pitch.min(127) as usize] += 1.0;

        let rhythm_bin = (note.start_tick as u64 * RHYTHM_BINS as u64 / total_ticks) as usize;
        rhythm[rhythm_bin.min(RHYTHM_BINS - 1)] += 1.0;

        let velocity_bin = note.velocity as usize * VELOCITY_BINS / 128;
        velocity[velocity_bin.min(VELOCITY_BINS - 1)] += 1.0;
    }

    let count = sequence.len() as f32;
    pitch
        .iter_mut()
        .chain(rhythm.iter_mut())
        .chain(velocity.iter_mut())
        .for_each(|bin| *bin /= count);
    density[0] = count / total_ticks as f32;

    features
}

/// Cosine similarity of two feature vectors, clamped to `[0, 1]`.
///
/// Returns 0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b).sqrt()).clamp(0.0, 1.0) as f32
}

/// Similarity of two sequences in `[0, 1]`, from their [`extract_features`].
pub fn similarity(a: &Sequence, b: &Sequence) -> f32 {
    cosine_similarity(&extract_features(a), &extract_features(b))
}
