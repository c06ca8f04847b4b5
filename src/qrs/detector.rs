use crate::config::QrsConfig;
use crate::constants::{LEARNING_BLOCK_S, MIN_FEATURE_ENERGY};
use crate::error::Result;
use crate::signal::{Beat, Signal, seconds_to_samples, seconds_to_samples_ceil};
use crate::signal_processing::{dominant_maxima, refine_peak};

use super::features::detection_feature;
use super::state::{DetectorState, ThresholdLevels};

/// Outcome of presenting one feature peak to the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Accepted as a beat at the given trace index
    Beat(usize),
    /// Below threshold; counted towards the noise level
    Noise,
    /// Above threshold but inside the refractory period of the last beat
    Refractory,
}

/// Adaptive QRS detector
///
/// Works on a complete conditioned trace in two phases. The learning phase
/// looks at the first `learning_window_s` of the QRS energy envelope to seed
/// the signal and noise levels. The detection phase then scans every envelope
/// peak that dominates its `peak_search_s` neighbourhood, from the start:
///
/// - peaks above the adaptive threshold become beats, placed on the largest
///   trace sample within `peak_search_s`, unless that lands inside the
///   refractory period of the previous beat;
/// - peaks below it feed the noise level;
/// - when the gap since the last beat grows past `search_back_factor` times
///   the mean RR interval, the strongest skipped peak above a lowered
///   threshold is recovered as a beat. Before any interval is known the
///   gap is measured against `rr_init_s`. If nothing can be recovered the
///   signal level drops to the strongest skipped peak, so one large
///   artefact cannot silence the detector for the rest of the trace.
pub struct QrsDetector {
    config: QrsConfig,
}

/// Per-run constants derived from the configuration and sampling rate
struct Scan<'a> {
    config: &'a QrsConfig,
    trace: &'a [f64],
    feature: &'a [f64],
    refractory: usize,
    search_radius: usize,
    /// Assumed RR interval in samples until one is measured
    rr_prior: f64,
    block_len: usize,
}

impl QrsDetector {
    /// Create a detector
    ///
    /// # Errors
    /// Returns `HrvError::Config` if any tuning parameter is out of range.
    pub fn new(config: QrsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &QrsConfig {
        &self.config
    }

    /// Detect beats in a conditioned trace
    pub fn detect(&self, signal: &Signal) -> Vec<Beat> {
        self.detect_with_state(signal).0
    }

    /// Detect beats and also return the detector state at the end of the trace
    pub fn detect_with_state(&self, signal: &Signal) -> (Vec<Beat>, DetectorState) {
        let state = DetectorState::learning(self.config.rr_history_len);
        let fs = signal.fs();
        let trace = signal.samples();
        if trace.is_empty() {
            return (Vec::new(), state);
        }

        let feature = detection_feature(trace, fs, self.config.integration_window_s);
        let peak_energy = feature.iter().copied().fold(0.0f64, f64::max);
        if peak_energy <= MIN_FEATURE_ENERGY {
            log::debug!("no QRS energy in {:.1}s trace", signal.duration());
            return (Vec::new(), state);
        }

        let scan = Scan {
            config: &self.config,
            trace,
            feature: &feature,
            refractory: seconds_to_samples_ceil(self.config.refractory_s, fs).max(1),
            search_radius: seconds_to_samples(self.config.peak_search_s, fs),
            rr_prior: self.config.rr_init_s * fs,
            block_len: seconds_to_samples(LEARNING_BLOCK_S, fs).max(1),
        };

        let maxima = dominant_maxima(&feature, scan.search_radius);

        let learn_len = seconds_to_samples(self.config.learning_window_s, fs)
            .clamp(1, feature.len());
        let levels = scan.learn(&maxima, learn_len);
        log::debug!(
            "learned levels over {} samples: signal {:.3e}, noise {:.3e}",
            learn_len,
            levels.signal,
            levels.noise
        );

        let mut state = state.start_detecting(levels);
        let mut beats = Vec::new();
        let mut skipped = Vec::new();

        for &peak in &maxima {
            state = scan.search_back(state, &mut skipped, &mut beats, peak);

            let (next, decision) = scan.step(state, peak);
            state = next;
            match decision {
                Decision::Beat(index) => {
                    log::trace!("beat at {} (feature peak {})", index, peak);
                    beats.push(index);
                    skipped.clear();
                }
                Decision::Noise => skipped.push(peak),
                Decision::Refractory => {
                    log::trace!("peak at {} inside refractory period", peak);
                }
            }
        }
        state = scan.search_back(state, &mut skipped, &mut beats, feature.len());

        debug_assert!(beats.windows(2).all(|w| w[1] >= w[0] + scan.refractory));

        log::debug!(
            "detected {} beats in {:.1}s ({} envelope peaks)",
            beats.len(),
            signal.duration(),
            maxima.len()
        );

        let beats = beats.into_iter().map(|index| Beat::new(index, fs)).collect();
        (beats, state)
    }
}

impl Scan<'_> {
    /// Seed the levels from the envelope peaks inside the learning window
    fn learn(&self, maxima: &[usize], learn_len: usize) -> ThresholdLevels {
        let peaks: Vec<usize> = maxima.iter().copied().take_while(|&p| p < learn_len).collect();
        let amplitudes: Vec<f64> = peaks.iter().map(|&p| self.feature[p]).collect();
        let block_maxima: Vec<f64> = peaks
            .chunk_by(|a, b| a / self.block_len == b / self.block_len)
            .map(|block| block.iter().map(|&p| self.feature[p]).fold(0.0, f64::max))
            .collect();
        ThresholdLevels::learn(&block_maxima, &amplitudes)
    }

    /// Classify one envelope peak and return the updated state
    fn step(&self, state: DetectorState, peak: usize) -> (DetectorState, Decision) {
        let amplitude = self.feature[peak];
        if amplitude > state.levels.threshold(self.config.threshold_fraction) {
            let index = refine_peak(self.trace, peak, self.search_radius);
            if state.refractory_clear(index, self.refractory) {
                let state = state.accept_beat(index, amplitude, self.config.signal_weight);
                (state, Decision::Beat(index))
            } else {
                (state, Decision::Refractory)
            }
        } else {
            let state = state.reject_noise(amplitude, self.config.noise_weight);
            (state, Decision::Noise)
        }
    }

    /// Recover beats missed before `position`, as long as the gap stays too long
    ///
    /// When the gap is due but no skipped peak clears the lowered threshold,
    /// the signal level falls to the strongest skipped peak and the skipped
    /// peaks are dropped.
    fn search_back(
        &self,
        mut state: DetectorState,
        skipped: &mut Vec<usize>,
        beats: &mut Vec<usize>,
        position: usize,
    ) -> DetectorState {
        while state.search_back_due(position, self.config.search_back_factor, self.rr_prior) {
            let lowered =
                self.config.search_back_ratio * state.levels.threshold(self.config.threshold_fraction);

            let candidate = skipped
                .iter()
                .copied()
                .filter(|&p| self.feature[p] > lowered)
                .map(|p| (p, refine_peak(self.trace, p, self.search_radius)))
                .filter(|&(_, index)| state.refractory_clear(index, self.refractory))
                .max_by(|a, b| self.feature[a.0].total_cmp(&self.feature[b.0]));

            let Some((peak, index)) = candidate else {
                let strongest = skipped
                    .iter()
                    .map(|&p| self.feature[p])
                    .fold(0.0f64, f64::max);
                if strongest > state.levels.noise && strongest < state.levels.signal {
                    log::debug!(
                        "no beat to recover before {}, signal level {:.3e} -> {:.3e}",
                        position,
                        state.levels.signal,
                        strongest
                    );
                    state = state.lower_signal_level(strongest);
                    skipped.clear();
                }
                break;
            };

            log::warn!(
                "search-back recovered beat at {} after a {} sample gap",
                index,
                position.saturating_sub(state.last_beat.unwrap_or(0))
            );
            state = state.accept_beat(index, self.feature[peak], self.config.search_back_weight);
            beats.push(index);
            skipped.retain(|&p| p > peak);
        }
        state
    }
}

/// Detect beats in `samples` taken at `fs` Hz with the default tuning and
/// the given refractory period in seconds
///
/// # Errors
/// `HrvError::InvalidRate` for a bad `fs`, `HrvError::Config` for a
/// non-positive refractory period.
pub fn detect(samples: &[f64], fs: f64, refractory_period: f64) -> Result<Vec<Beat>> {
    let signal = Signal::new(samples.to_vec(), fs)?;
    let detector = QrsDetector::new(QrsConfig::with_refractory(refractory_period))?;
    Ok(detector.detect(&signal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HrvError;
    use crate::qrs::DetectorPhase;

    fn pulse_train(fs: f64, duration: f64, beats: &[(f64, f64)]) -> Vec<f64> {
        let len = (duration * fs) as usize;
        let width = 0.010;
        (0..len)
            .map(|i| {
                let t = i as f64 / fs;
                beats
                    .iter()
                    .map(|&(bt, amp)| {
                        let d = (t - bt) / width;
                        amp * (-0.5 * d * d).exp()
                    })
                    .sum()
            })
            .collect()
    }

    fn regular_beats(count: usize, start: f64, rr: f64) -> Vec<(f64, f64)> {
        (0..count).map(|k| (start + k as f64 * rr, 1.0)).collect()
    }

    fn detector() -> QrsDetector {
        QrsDetector::new(QrsConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_trace() {
        let signal = Signal::new(Vec::new(), 128.0).unwrap();
        let (beats, state) = detector().detect_with_state(&signal);
        assert!(beats.is_empty());
        assert_eq!(state.phase, DetectorPhase::Learning);
    }

    #[test]
    fn test_flat_and_zero_traces() {
        for level in [0.0, 1.5] {
            let signal = Signal::new(vec![level; 2560], 128.0).unwrap();
            assert!(detector().detect(&signal).is_empty());
        }
    }

    #[test]
    fn test_regular_beats_are_found() {
        let fs = 250.0;
        let truth = regular_beats(20, 0.5, 0.8);
        let signal = Signal::new(pulse_train(fs, 17.0, &truth), fs).unwrap();
        let beats = detector().detect(&signal);

        assert_eq!(beats.len(), truth.len());
        for (beat, &(t, _)) in beats.iter().zip(&truth) {
            assert!((beat.timestamp - t).abs() <= 1.0 / fs, "{} vs {}", beat.timestamp, t);
        }
    }

    #[test]
    fn test_pulses_inside_refractory_collapse() {
        let fs = 250.0;
        let signal = Signal::new(pulse_train(fs, 6.0, &[(3.0, 1.0), (3.2, 1.0)]), fs).unwrap();
        let beats = detector().detect(&signal);
        assert_eq!(beats.len(), 1);
        assert!((beats[0].timestamp - 3.0).abs() <= 1.0 / fs);
    }

    #[test]
    fn test_refractory_invariant() {
        let fs = 250.0;
        // Extra pulses 0.25 s after some beats
        let mut truth = regular_beats(15, 0.5, 1.0);
        truth.extend([(3.75, 0.9), (7.75, 1.0), (10.75, 1.1)]);
        let signal = Signal::new(pulse_train(fs, 16.0, &truth), fs).unwrap();
        let beats = detector().detect(&signal);

        assert!(!beats.is_empty());
        for w in beats.windows(2) {
            assert!(w[1].index > w[0].index);
            assert!(w[1].timestamp - w[0].timestamp >= 0.4 - 1e-9);
        }
    }

    #[test]
    fn test_shorter_than_learning_window() {
        let fs = 128.0;
        let signal = Signal::new(pulse_train(fs, 3.0, &regular_beats(3, 0.5, 1.0)), fs).unwrap();
        let beats = detector().detect(&signal);
        let indices: Vec<usize> = beats.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![64, 192, 320]);
    }

    #[test]
    fn test_inverted_complexes() {
        let fs = 128.0;
        let truth: Vec<(f64, f64)> = regular_beats(3, 0.5, 1.0)
            .into_iter()
            .map(|(t, a)| (t, -a))
            .collect();
        let signal = Signal::new(pulse_train(fs, 3.0, &truth), fs).unwrap();
        let indices: Vec<usize> = detector().detect(&signal).iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![64, 192, 320]);
    }

    #[test]
    fn test_artefact_during_learning() {
        let fs = 128.0;
        let mut truth = regular_beats(60, 0.5, 1.0);
        truth[2].1 = 5.0;
        let samples = pulse_train(fs, 60.0, &truth);

        let beats = detect(&samples, fs, 0.4).unwrap();
        assert_eq!(beats.len(), 60);
        for (beat, &(t, _)) in beats.iter().zip(&truth) {
            assert!((beat.timestamp - t).abs() <= 1.0 / fs, "{} vs {}", beat.timestamp, t);
        }
    }

    #[test]
    fn test_artefact_as_first_beat() {
        // No interval is known yet when the detector stalls behind the
        // artefact, so the gap is judged against the initial RR
        let fs = 128.0;
        let mut truth = regular_beats(60, 0.5, 1.0);
        truth[0].1 = 10.0;
        let samples = pulse_train(fs, 60.0, &truth);

        let beats = detect(&samples, fs, 0.4).unwrap();
        assert!(beats.len() >= 58, "{} beats", beats.len());
        for &(t, _) in &truth[2..] {
            assert!(
                beats.iter().any(|b| (b.timestamp - t).abs() <= 1.0 / fs),
                "beat at {} missing",
                t
            );
        }
    }

    #[test]
    fn test_search_back_recovers_weak_beat() {
        let fs = 250.0;
        let mut truth = regular_beats(20, 0.5, 1.0);
        truth[12].1 = 0.42;
        let signal = Signal::new(pulse_train(fs, 20.0, &truth), fs).unwrap();

        let beats = detector().detect(&signal);
        assert_eq!(beats.len(), 20);
        assert!(beats.iter().any(|b| (b.timestamp - 12.5).abs() <= 1.0 / fs));

        let mut no_search_back = QrsConfig::default();
        no_search_back.search_back_factor = 100.0;
        let beats = QrsDetector::new(no_search_back).unwrap().detect(&signal);
        assert_eq!(beats.len(), 19);
    }

    #[test]
    fn test_threshold_tracks_amplitude_drift() {
        let fs = 250.0;
        // Amplitude halves slowly over the recording
        let truth: Vec<(f64, f64)> = (0..40)
            .map(|k| (0.5 + k as f64 * 0.9, 1.0 - 0.5 * k as f64 / 39.0))
            .collect();
        let signal = Signal::new(pulse_train(fs, 36.5, &truth), fs).unwrap();
        let (beats, state) = detector().detect_with_state(&signal);

        assert_eq!(beats.len(), truth.len());
        // Signal level follows the weaker beats down (energy scales with amplitude squared)
        let (_, first_state) = detector().detect_with_state(
            &Signal::new(pulse_train(fs, 8.0, &truth[..8]), fs).unwrap(),
        );
        assert!(state.levels.signal < 0.5 * first_state.levels.signal);
        assert_eq!(state.rr.mean().map(|m| m.round()), Some(225.0));
    }

    #[test]
    fn test_deterministic() {
        let fs = 250.0;
        let signal = Signal::new(pulse_train(fs, 12.0, &regular_beats(12, 0.3, 0.95)), fs).unwrap();
        let det = detector();
        assert_eq!(det.detect_with_state(&signal), det.detect_with_state(&signal));
    }

    #[test]
    fn test_detect_function_validates_inputs() {
        assert!(matches!(
            detect(&[0.0; 10], 0.0, 0.4),
            Err(HrvError::InvalidRate(_))
        ));
        assert!(matches!(detect(&[0.0; 10], 128.0, 0.0), Err(HrvError::Config(_))));
        assert!(detect(&[], 128.0, 0.4).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = QrsConfig::default();
        config.threshold_fraction = 1.5;
        assert!(QrsDetector::new(config).is_err());
    }
}
