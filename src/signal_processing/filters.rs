use crate::error::{HrvError, Result};
use crate::signal::Signal;

use super::butterworth::{FilterSpec, SecondOrderSection, design_bandpass};
use super::filter::{Filter, SosCascade, steady_state};

/// Zero-phase Butterworth band-pass filter for ECG conditioning
///
/// Suppresses baseline wander below `low_hz` and mains/muscle noise above
/// `high_hz`. The signal is filtered forward and then backward, so the output
/// has no group delay and the squared magnitude response of the designed
/// filter.
///
/// Both ends are extended by odd reflection before filtering and each pass
/// starts from the steady state of its first sample, which keeps edge
/// transients small and the result fully deterministic.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    spec: FilterSpec,
    sections: Vec<SecondOrderSection>,
    unit_state: Vec<[f64; 2]>,
}

impl BandpassFilter {
    /// Design the filter described by `spec`
    ///
    /// # Errors
    /// Returns `HrvError::InvalidSpec` if the cutoffs or order are invalid and
    /// `HrvError::NumericInstability` if the design degenerates.
    pub fn new(spec: FilterSpec) -> Result<Self> {
        let sections = design_bandpass(&spec)?;
        let unit_state = steady_state(&sections);
        Ok(Self {
            spec,
            sections,
            unit_state,
        })
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn sections(&self) -> &[SecondOrderSection] {
        &self.sections
    }

    /// Number of samples added at each end before filtering
    fn edge_len(&self, len: usize) -> usize {
        (3 * (2 * self.sections.len() + 1)).min(len.saturating_sub(1))
    }

    /// Filter `signal` forward and backward
    ///
    /// # Errors
    /// `HrvError::InvalidSpec` if the signal rate differs from the design
    /// rate, `HrvError::NumericInstability` if the output is not finite.
    pub fn apply(&self, signal: &Signal) -> Result<Signal> {
        if (signal.fs() - self.spec.fs).abs() > 1e-9 * self.spec.fs {
            return Err(HrvError::InvalidSpec(format!(
                "filter designed for {} Hz applied to a {} Hz signal",
                self.spec.fs,
                signal.fs()
            )));
        }
        if signal.is_empty() {
            return Ok(signal.clone());
        }

        let x = signal.samples();
        let edge = self.edge_len(x.len());
        let mut buffer = odd_extend(x, edge);

        self.settled_pass(&mut buffer);
        buffer.reverse();
        self.settled_pass(&mut buffer);
        buffer.reverse();

        let filtered = buffer[edge..edge + x.len()].to_vec();
        if let Some(pos) = filtered.iter().position(|v| !v.is_finite()) {
            return Err(HrvError::NumericInstability(format!(
                "non-finite filter output at sample {}",
                pos
            )));
        }

        Ok(signal.with_samples(filtered))
    }

    fn settled_pass(&self, buffer: &mut [f64]) {
        let level = buffer.first().copied().unwrap_or(0.0);
        let mut cascade = SosCascade::settled(&self.sections, &self.unit_state, level);
        cascade.process_buffer(buffer);
    }
}

/// Design a band-pass filter for `spec` and apply it with zero phase
pub fn apply(signal: &Signal, spec: &FilterSpec) -> Result<Signal> {
    BandpassFilter::new(*spec)?.apply(signal)
}

/// Extend `x` by `edge` samples at each end, reflected through the end points
fn odd_extend(x: &[f64], edge: usize) -> Vec<f64> {
    let n = x.len();
    let first = x[0];
    let last = x[n - 1];
    let mut out = Vec::with_capacity(n + 2 * edge);
    out.extend((1..=edge).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    out.extend((1..=edge).map(|i| 2.0 * last - x[n - 1 - i]));
    out
}
