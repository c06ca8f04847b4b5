use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Adaptive signal and noise peak levels
///
/// Both levels are exponential averages of classified feature peaks; the
/// detection threshold sits between them. Updates return a new value so a
/// run can be replayed step by step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdLevels {
    pub signal: f64,
    pub noise: f64,
}

impl ThresholdLevels {
    pub fn new(signal: f64, noise: f64) -> Self {
        Self { signal, noise }
    }

    /// Initial levels from the learning segment
    ///
    /// `block_maxima` holds the strongest peak of each block of the segment;
    /// their median sets the signal level, so one artefact cannot dominate
    /// it. Peaks in `amplitudes` below half that level set the noise level.
    pub fn learn(block_maxima: &[f64], amplitudes: &[f64]) -> Self {
        let signal = median(block_maxima);
        if signal <= 0.0 {
            return Self::new(0.0, 0.0);
        }

        let (noise_sum, noise_n) = amplitudes
            .iter()
            .filter(|&&a| a < 0.5 * signal)
            .fold((0.0, 0usize), |(sum, n), &a| (sum + a, n + 1));
        let noise = if noise_n > 0 {
            noise_sum / noise_n as f64
        } else {
            0.0
        };
        Self::new(signal, noise)
    }

    /// Detection threshold, `fraction` of the way from noise to signal level
    pub fn threshold(&self, fraction: f64) -> f64 {
        self.noise + fraction * (self.signal - self.noise).max(0.0)
    }

    #[must_use]
    pub fn with_signal_peak(self, amplitude: f64, weight: f64) -> Self {
        Self {
            signal: weight * amplitude + (1.0 - weight) * self.signal,
            ..self
        }
    }

    #[must_use]
    pub fn with_noise_peak(self, amplitude: f64, weight: f64) -> Self {
        Self {
            noise: weight * amplitude + (1.0 - weight) * self.noise,
            ..self
        }
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}

/// Most recent RR intervals, in samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RrHistory {
    intervals: VecDeque<usize>,
    capacity: usize,
}

impl RrHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            intervals: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, interval: usize) {
        if self.intervals.len() == self.capacity {
            self.intervals.pop_front();
        }
        self.intervals.push_back(interval);
    }

    pub fn mean(&self) -> Option<f64> {
        if self.intervals.is_empty() {
            return None;
        }
        Some(self.intervals.iter().sum::<usize>() as f64 / self.intervals.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorPhase {
    /// Estimating the initial levels; no beats are emitted
    Learning,
    /// Scanning for beats
    Detecting,
}

/// Everything the detector carries from one feature peak to the next
///
/// Serializable so a run can be checkpointed and inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorState {
    pub phase: DetectorPhase,
    pub levels: ThresholdLevels,
    /// Sample index of the last accepted beat
    pub last_beat: Option<usize>,
    pub rr: RrHistory,
}

impl DetectorState {
    pub fn learning(rr_history_len: usize) -> Self {
        Self {
            phase: DetectorPhase::Learning,
            levels: ThresholdLevels::new(0.0, 0.0),
            last_beat: None,
            rr: RrHistory::new(rr_history_len),
        }
    }

    #[must_use]
    pub fn start_detecting(self, levels: ThresholdLevels) -> Self {
        Self {
            phase: DetectorPhase::Detecting,
            levels,
            ..self
        }
    }

    /// Whether a beat at `index` respects the refractory period
    pub fn refractory_clear(&self, index: usize, refractory_samples: usize) -> bool {
        match self.last_beat {
            None => true,
            Some(last) => index >= last + refractory_samples.max(1),
        }
    }

    /// Whether the gap up to `position` is long enough to search back
    ///
    /// Until an interval has been measured the gap is compared against
    /// `rr_prior`, in samples.
    pub fn search_back_due(&self, position: usize, factor: f64, rr_prior: f64) -> bool {
        match self.last_beat {
            Some(last) => {
                let mean_rr = self.rr.mean().unwrap_or(rr_prior);
                position.saturating_sub(last) as f64 > factor * mean_rr
            }
            None => false,
        }
    }

    #[must_use]
    pub fn accept_beat(mut self, index: usize, amplitude: f64, weight: f64) -> Self {
        if let Some(last) = self.last_beat {
            self.rr.push(index - last);
        }
        Self {
            levels: self.levels.with_signal_peak(amplitude, weight),
            last_beat: Some(index),
            ..self
        }
    }

    /// Drop the signal level to `amplitude` after a gap with no beat to recover
    #[must_use]
    pub fn lower_signal_level(self, amplitude: f64) -> Self {
        Self {
            levels: ThresholdLevels::new(amplitude.min(self.levels.signal), self.levels.noise),
            ..self
        }
    }

    #[must_use]
    pub fn reject_noise(self, amplitude: f64, weight: f64) -> Self {
        Self {
            levels: self.levels.with_noise_peak(amplitude, weight),
            ..self
        }
    }
}
