use rand::RngExt;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::error::Result;
use crate::signal::Signal;

/// One Gaussian component of a heartbeat, relative to the R peak
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct Wave {
    pub offset_s: f64,
    pub width_s: f64,
    pub amplitude: f64,
}

impl Wave {
    pub const fn new(offset_s: f64, width_s: f64, amplitude: f64) -> Self {
        Self {
            offset_s,
            width_s,
            amplitude,
        }
    }
}

/// P, Q, R, S and T waves of a normal sinus beat, in millivolt-like units
pub const NORMAL_BEAT: [Wave; 5] = [
    Wave::new(-0.160, 0.025, 0.12),
    Wave::new(-0.025, 0.008, -0.10),
    Wave::new(0.0, 0.010, 1.0),
    Wave::new(0.025, 0.008, -0.20),
    Wave::new(0.260, 0.040, 0.30),
];

/// Only the R wave
pub const R_ONLY: [Wave; 1] = [Wave::new(0.0, 0.010, 1.0)];

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct RhythmConfig {
    pub heart_rate_bpm: f64,
    /// Standard deviation of each RR interval around the mean, in seconds
    pub rr_jitter_s: f64,
    /// Time of the first R peak
    pub first_beat_s: f64,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            heart_rate_bpm: 60.0,
            rr_jitter_s: 0.0,
            first_beat_s: 0.5,
        }
    }
}

impl RhythmConfig {
    pub fn mean_rr(&self) -> f64 {
        60.0 / self.heart_rate_bpm
    }
}

/// R peak times of a rhythm over `duration_s`
///
/// Intervals are drawn around the mean RR and clamped to at least 0.3 s.
pub fn beat_times(config: &RhythmConfig, duration_s: f64, rng: &mut ChaCha8Rng) -> Vec<f64> {
    let mean_rr = config.mean_rr();
    let jitter = (config.rr_jitter_s > 0.0)
        .then(|| Normal::new(0.0, config.rr_jitter_s).ok())
        .flatten();

    let mut times = Vec::new();
    let mut t = config.first_beat_s;
    while t < duration_s {
        times.push(t);
        let rr = mean_rr + jitter.as_ref().map_or(0.0, |n| n.sample(rng));
        t += rr.max(0.3);
    }
    times
}

/// Sum of `morphology` placed at every `(time, scale)` in `beats`
///
/// Each wave is only evaluated within five widths of its centre, so long
/// traces stay cheap.
pub fn render_beats(fs: f64, len: usize, beats: &[(f64, f64)], morphology: &[Wave]) -> Vec<f64> {
    let mut samples = vec![0.0; len];
    for &(beat, scale) in beats {
        for wave in morphology {
            let centre = beat + wave.offset_s;
            let reach = 5.0 * wave.width_s;
            let start = ((centre - reach) * fs).floor().max(0.0) as usize;
            let end = (((centre + reach) * fs).ceil().max(0.0) as usize).min(len);
            for (i, sample) in samples.iter_mut().enumerate().take(end).skip(start) {
                let d = (i as f64 / fs - centre) / wave.width_s;
                *sample += scale * wave.amplitude * (-0.5 * d * d).exp();
            }
        }
    }
    samples
}

/// Synthetic ECG together with the R peak times it was built from
#[derive(Debug, Clone)]
pub struct SyntheticEcg {
    pub signal: Signal,
    pub beat_times: Vec<f64>,
}

/// Clean synthetic ECG with a jittered rhythm
pub fn generate_ecg(
    fs: f64,
    duration_s: f64,
    rhythm: &RhythmConfig,
    rng: &mut ChaCha8Rng,
) -> Result<SyntheticEcg> {
    let len = (duration_s * fs).max(0.0) as usize;
    let beat_times = beat_times(rhythm, duration_s, rng);
    // Small beat-to-beat amplitude variation
    let beats: Vec<(f64, f64)> = beat_times
        .iter()
        .map(|&t| (t, 1.0 + 0.05 * (rng.random::<f64>() - 0.5)))
        .collect();
    let samples = render_beats(fs, len, &beats, &NORMAL_BEAT);
    Ok(SyntheticEcg {
        signal: Signal::new(samples, fs)?,
        beat_times,
    })
}
