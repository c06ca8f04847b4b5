//! Synthetic ECG generation for tests and benchmarks

mod ecg;
mod measure;
mod noise;

pub use ecg::{
    NORMAL_BEAT, R_ONLY, RhythmConfig, SyntheticEcg, Wave, beat_times, generate_ecg, render_beats,
};
pub use measure::{BeatMatch, DetectionStats, match_beats, measure_detection};
pub use noise::{
    AdditiveNoiseConfig, BaselineWanderConfig, ImpulseNoiseConfig, NoiseConfig, PowerlineConfig,
    RespirationConfig, apply_noise, signal_power,
};

use rand_chacha::ChaCha8Rng;

/// Seeded generator for reproducible synthetic recordings
pub fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    noise::create_rng(seed)
}
