//! Numeric constants for signal processing stability
//!
//! These constants define thresholds and epsilon values used throughout
//! the conditioning and detection pipeline to keep it numerically stable.

/// Largest pole magnitude accepted from a filter design.
/// Anything at or beyond this is treated as an unstable (or marginal) design.
pub const MAX_POLE_MAGNITUDE: f64 = 1.0 - 1e-12;

/// Imaginary parts below this (relative to the pole magnitude) are treated
/// as zero when grouping poles into second-order sections.
pub const REAL_POLE_EPSILON: f64 = 1e-10;

/// Minimum peak value of the detection feature.
/// A feature signal whose largest value is below this carries no QRS energy
/// (flat or all-zero input) and produces no beats.
pub const MIN_FEATURE_ENERGY: f64 = 1e-24;

/// Slack used when converting durations in seconds to whole sample counts,
/// so that e.g. 0.4 s at 1000 Hz is exactly 400 samples.
pub const SAMPLE_ROUNDING_EPSILON: f64 = 1e-9;

/// Length of the blocks the learning segment is split into. The median of
/// the per-block feature maxima seeds the signal level.
pub const LEARNING_BLOCK_S: f64 = 1.0;
