//! Tolerance constants for codec and model tests.

/// Floating point rounding errors for values that should be exact.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Allowed tick drift after a tensor round trip (one rounding step).
pub const TICK_TOLERANCE: u32 = 1;
