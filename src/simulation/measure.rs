use crate::config::PipelineConfig;
use crate::error::Result;
use crate::processing::RriPipeline;
use crate::signal::{Signal, seconds_to_samples};

use super::{NoiseConfig, SyntheticEcg, apply_noise};

/// Detected beats matched against known R peak times
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeatMatch {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl BeatMatch {
    pub fn sensitivity(&self) -> f64 {
        let total = self.true_positives + self.false_negatives;
        if total == 0 {
            return 1.0;
        }
        self.true_positives as f64 / total as f64
    }

    pub fn positive_predictivity(&self) -> f64 {
        let total = self.true_positives + self.false_positives;
        if total == 0 {
            return 1.0;
        }
        self.true_positives as f64 / total as f64
    }
}

/// Pair detections with reference times no more than `tolerance_s` apart
///
/// Both slices must be sorted. Each reference matches at most one detection.
pub fn match_beats(detected: &[f64], reference: &[f64], tolerance_s: f64) -> BeatMatch {
    let mut result = BeatMatch::default();
    let (mut i, mut j) = (0, 0);
    while i < detected.len() && j < reference.len() {
        let d = detected[i] - reference[j];
        if d.abs() <= tolerance_s {
            result.true_positives += 1;
            i += 1;
            j += 1;
        } else if d < 0.0 {
            result.false_positives += 1;
            i += 1;
        } else {
            result.false_negatives += 1;
            j += 1;
        }
    }
    result.false_positives += detected.len() - i;
    result.false_negatives += reference.len() - j;
    result
}

#[derive(Debug, Clone)]
pub struct DetectionStats {
    pub matches: BeatMatch,
    pub mean_rri: Option<f64>,
    pub reference_mean_rri: Option<f64>,
}

fn mean_interval(times: &[f64]) -> Option<f64> {
    (times.len() >= 2).then(|| (times[times.len() - 1] - times[0]) / (times.len() - 1) as f64)
}

/// Run the pipeline on a noisy copy of `ecg` and score the detections
///
/// Beat times come back relative to the trimmed signal, so they are shifted
/// by the warm-up trim before matching. Reference beats too close to either
/// end of the analysed span are ignored.
pub fn measure_detection(
    ecg: &SyntheticEcg,
    noise: &NoiseConfig,
    config: &PipelineConfig,
    tolerance_s: f64,
) -> Result<DetectionStats> {
    let fs = ecg.signal.fs();
    let noisy = Signal::new(apply_noise(ecg.signal.samples(), noise, fs), fs)?;

    let pipeline = RriPipeline::new(config.clone())?;
    let output = pipeline.run(&noisy)?;

    let target = config.resample.target_rate;
    let start = seconds_to_samples(config.warmup_trim_s, target) as f64 / target;
    let detected: Vec<f64> = output.beats.iter().map(|b| b.timestamp + start).collect();
    let reference: Vec<f64> = ecg
        .beat_times
        .iter()
        .copied()
        .filter(|&t| t > start + tolerance_s && t < noisy.duration() - tolerance_s)
        .collect();
    let detected: Vec<f64> = detected
        .into_iter()
        .filter(|&t| t > start + tolerance_s && t < noisy.duration() - tolerance_s)
        .collect();

    Ok(DetectionStats {
        matches: match_beats(&detected, &reference, tolerance_s),
        mean_rri: (!output.rri.is_empty())
            .then(|| output.rri.iter().sum::<f64>() / output.rri.len() as f64),
        reference_mean_rri: mean_interval(&reference),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_beats() {
        let reference = [1.0, 2.0, 3.0, 4.0];
        let detected = [1.01, 2.5, 3.0, 3.98, 4.6];
        let m = match_beats(&detected, &reference, 0.05);
        assert_eq!(
            m,
            BeatMatch {
                true_positives: 3,
                false_positives: 2,
                false_negatives: 1,
            }
        );
        assert!((m.sensitivity() - 0.75).abs() < 1e-12);
        assert!((m.positive_predictivity() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_match_nothing() {
        let m = match_beats(&[], &[], 0.05);
        assert_eq!(m.sensitivity(), 1.0);
        assert_eq!(m.positive_predictivity(), 1.0);
    }
}
