//! Grid quantization.

use crate::note::{Note, Ticks};
use crate::sequence::Sequence;

/// Nearest multiple of `grid`, halfway rounding up. A zero grid is a no-op.
#[inline]
pub fn snap_to_grid(tick: Ticks, grid: Ticks) -> Ticks {
    if grid == 0 {
        return tick;
    }
    let remainder = tick % grid;
    let down = tick - remainder;
    if remainder as u64 * 2 >= grid as u64 {
        down.saturating_add(grid)
    } else {
        down
    }
}

/// Snap each note's start and end independently to the grid.
///
/// Duration becomes `end - start`, but never less than one grid step.
/// `total_ticks` grows if a snapped note ends past the original end.
pub fn quantize_sequence(sequence: &Sequence, grid_size: Ticks) -> Sequence {
    if grid_size == 0 {
        return sequence.clone();
    }

    let notes = sequence
        .notes
        .iter()
        .map(|note| {
            let start = snap_to_grid(note.start_tick, grid_size);
            let end = snap_to_grid(note.end_tick(), grid_size);
            Note {
                start_tick: start,
                duration: end.saturating_sub(start).max(grid_size),
                ..*note
            }
        })
        .collect();

    sequence.with_same_context(notes)
}
