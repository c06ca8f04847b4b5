use serde::{Deserialize, Serialize};

use crate::constants::SAMPLE_ROUNDING_EPSILON;
use crate::error::{HrvError, Result};

/// Uniformly sampled real-valued trace.
///
/// The sampling rate is validated on construction. The sample vector may be
/// empty: short recordings flow through every stage and come out as empty
/// results instead of errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    samples: Vec<f64>,
    fs: f64,
}

impl Signal {
    /// Create a signal from samples taken at `fs` Hz.
    ///
    /// # Errors
    /// Returns `HrvError::InvalidRate` if `fs` is not a finite positive number.
    pub fn new(samples: Vec<f64>, fs: f64) -> Result<Self> {
        validate_rate(fs)?;
        Ok(Self { samples, fs })
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    /// Sampling rate in Hz
    pub fn fs(&self) -> f64 {
        self.fs
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.fs
    }

    /// Return a new signal without its first `seconds` of samples.
    ///
    /// Trimming more than the signal holds yields an empty signal.
    pub fn trim_start(&self, seconds: f64) -> Self {
        let skip = seconds_to_samples(seconds.max(0.0), self.fs).min(self.samples.len());
        Self {
            samples: self.samples[skip..].to_vec(),
            fs: self.fs,
        }
    }

    /// Build a signal of the same rate from derived samples.
    pub(crate) fn with_samples(&self, samples: Vec<f64>) -> Self {
        Self {
            samples,
            fs: self.fs,
        }
    }
}

/// A detected QRS complex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    /// Sample index into the conditioned signal
    pub index: usize,
    /// Seconds from the start of the conditioned signal
    pub timestamp: f64,
}

impl Beat {
    pub fn new(index: usize, fs: f64) -> Self {
        Self {
            index,
            timestamp: index as f64 / fs,
        }
    }
}

/// One point of a Lorenz (Poincaré) plot: an RR interval against its successor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LorenzPoint {
    pub x: f64,
    pub y: f64,
}

pub(crate) fn validate_rate(fs: f64) -> Result<()> {
    if !fs.is_finite() || fs <= 0.0 {
        return Err(HrvError::InvalidRate(fs));
    }
    Ok(())
}

/// Round a duration to the nearest whole number of samples.
pub(crate) fn seconds_to_samples(seconds: f64, fs: f64) -> usize {
    (seconds * fs).round().max(0.0) as usize
}

/// Smallest whole number of samples covering at least `seconds`.
pub(crate) fn seconds_to_samples_ceil(seconds: f64, fs: f64) -> usize {
    (seconds * fs - SAMPLE_ROUNDING_EPSILON).ceil().max(0.0) as usize
}
