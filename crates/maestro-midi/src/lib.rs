//! Note data model and note/tensor codec for Maestro.
//!
//! Everything here is pure: functions take sequences by reference and
//! return new ones. Degenerate inputs (empty sequences, zero grids, zero
//! norms) have defined results instead of errors.
//!
//! # Example
//!
//! ```ignore
//! use maestro_midi::{quantize_sequence, sequence_to_tensor, Note, Sequence};
//!
//! let seq = Sequence::default().with_notes([Note::new(60, 100, 7, 470)]);
//! let tight = quantize_sequence(&seq, 120);
//! let tensor = sequence_to_tensor(&tight);
//! assert_eq!(tensor.len(), 5);
//! ```

mod features;
mod groove;
mod note;
mod quantize;
mod sequence;
mod tensor;
mod transform;

pub use features::{
    cosine_similarity, extract_features, similarity, FEATURE_LEN, PITCH_BINS, RHYTHM_BINS,
    VELOCITY_BINS,
};
pub use groove::{apply_groove_timing, apply_swing, GrooveVector};
pub use note::{Note, Ticks, MIDI_MAX};
pub use quantize::{quantize_sequence, snap_to_grid};
pub use sequence::{Sequence, TimeSignature, DEFAULT_TICKS_PER_QUARTER};
pub use tensor::{
    denormalize, normalize, sequence_to_tensor, tensor_to_sequence, tensor_to_sequence_scaled,
    NOTE_RECORD_WIDTH,
};
pub use transform::{
    extract_subsequence, merge_sequences, random_sequence, transpose_sequence,
    MIN_AUDIBLE_VELOCITY,
};
