use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_POLE_MAGNITUDE, REAL_POLE_EPSILON};
use crate::error::{HrvError, Result};

/// Band-pass filter request
///
/// Cutoffs are in Hz; the design works on them as fractions of the Nyquist
/// frequency of `fs`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub low_hz: f64,
    pub high_hz: f64,
    pub order: usize,
    pub fs: f64,
}

impl FilterSpec {
    /// Create a validated band-pass specification
    ///
    /// # Errors
    /// Returns `HrvError::InvalidSpec` unless `0 < low_hz < high_hz < fs / 2`
    /// and `order >= 1`.
    pub fn new(low_hz: f64, high_hz: f64, order: usize, fs: f64) -> Result<Self> {
        let spec = Self {
            low_hz,
            high_hz,
            order,
            fs,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(HrvError::InvalidSpec(format!(
                "sampling rate must be positive, got {}",
                self.fs
            )));
        }
        if !self.low_hz.is_finite() || !self.high_hz.is_finite() {
            return Err(HrvError::InvalidSpec("cutoffs must be finite".to_string()));
        }
        if self.order < 1 {
            return Err(HrvError::InvalidSpec("order must be at least 1".to_string()));
        }
        if self.low_hz <= 0.0 {
            return Err(HrvError::InvalidSpec(format!(
                "low cutoff must be positive, got {} Hz",
                self.low_hz
            )));
        }
        if self.low_hz >= self.high_hz {
            return Err(HrvError::InvalidSpec(format!(
                "low cutoff {} Hz must be below high cutoff {} Hz",
                self.low_hz, self.high_hz
            )));
        }
        if self.high_hz >= self.nyquist() {
            return Err(HrvError::InvalidSpec(format!(
                "high cutoff {} Hz must be below Nyquist {} Hz",
                self.high_hz,
                self.nyquist()
            )));
        }
        Ok(())
    }

    pub fn nyquist(&self) -> f64 {
        0.5 * self.fs
    }

    /// Cutoffs as fractions of the Nyquist frequency
    pub fn normalized_band(&self) -> (f64, f64) {
        (self.low_hz / self.nyquist(), self.high_hz / self.nyquist())
    }
}

/// Biquad coefficients, `a[0]` normalized to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondOrderSection {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl SecondOrderSection {
    fn from_roots(zeros: (Complex64, Complex64), poles: (Complex64, Complex64), gain: f64) -> Self {
        let (z1, z2) = zeros;
        let (p1, p2) = poles;
        Self {
            b: [gain, -gain * (z1 + z2).re, gain * (z1 * z2).re],
            a: [1.0, -(p1 + p2).re, (p1 * p2).re],
        }
    }

    /// Gain at 0 Hz
    pub fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }

    /// Complex response at `omega` radians per sample
    pub fn response(&self, omega: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b[0] + z1 * self.b[1] + z2 * self.b[2];
        let den = self.a[0] + z1 * self.a[1] + z2 * self.a[2];
        num / den
    }

    fn is_finite(&self) -> bool {
        self.b.iter().chain(self.a.iter()).all(|c| c.is_finite())
    }
}

/// Complex response of a section cascade at `omega` radians per sample
pub fn frequency_response(sections: &[SecondOrderSection], omega: f64) -> Complex64 {
    sections
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(omega))
}

/// Design a digital Butterworth band-pass filter as second-order sections
///
/// Follows the classic analog-prototype route: Butterworth poles on the unit
/// circle, low-pass to band-pass transform around the pre-warped band centre,
/// then the bilinear transform. An order `N` request yields `N` sections.
///
/// # Errors
/// `HrvError::InvalidSpec` for an invalid `spec`, `HrvError::NumericInstability`
/// if the resulting coefficients are not finite or a pole is not strictly
/// inside the unit circle.
pub fn design_bandpass(spec: &FilterSpec) -> Result<Vec<SecondOrderSection>> {
    spec.validate()?;

    let n = spec.order;
    let (low, high) = spec.normalized_band();

    // Bilinear transform with fs = 2, i.e. frequencies normalized to Nyquist
    let fs2 = 4.0;
    let w1 = fs2 * (PI * low / 2.0).tan();
    let w2 = fs2 * (PI * high / 2.0).tan();
    let bw = w2 - w1;
    let w0 = (w1 * w2).sqrt();

    let mut analog_poles = Vec::with_capacity(2 * n);
    for k in 0..n {
        let m = 2.0 * k as f64 + 1.0 - n as f64;
        let proto = -Complex64::from_polar(1.0, PI * m / (2.0 * n as f64));
        let lp = proto * (bw / 2.0);
        let disc = (lp * lp - w0 * w0).sqrt();
        analog_poles.push(lp + disc);
        analog_poles.push(lp - disc);
    }

    // N analog zeros at s = 0; the band-pass gain is bw^N
    let denom = analog_poles
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, p| acc * (fs2 - *p));
    let gain = (Complex64::new((bw * fs2).powi(n as i32), 0.0) / denom).re;

    let digital_poles: Vec<Complex64> = analog_poles
        .iter()
        .map(|p| (fs2 + *p) / (fs2 - *p))
        .collect();

    if let Some(p) = digital_poles
        .iter()
        .find(|p| !p.norm().is_finite() || p.norm() >= MAX_POLE_MAGNITUDE)
    {
        return Err(HrvError::NumericInstability(format!(
            "unstable pole at {:.6}{:+.6}i",
            p.re, p.im
        )));
    }

    let mut complex_poles = Vec::new();
    let mut real_poles = Vec::new();
    for p in &digital_poles {
        let tol = REAL_POLE_EPSILON * p.norm().max(1.0);
        if p.im.abs() <= tol {
            real_poles.push(p.re);
        } else if p.im > 0.0 {
            complex_poles.push(*p);
        }
    }

    if complex_poles.len() * 2 + real_poles.len() != digital_poles.len() || real_poles.len() % 2 != 0
    {
        return Err(HrvError::NumericInstability(
            "poles do not form conjugate pairs".to_string(),
        ));
    }

    let mut pole_pairs: Vec<(Complex64, Complex64)> =
        complex_poles.iter().map(|p| (*p, p.conj())).collect();
    real_poles.sort_by(|a, b| a.total_cmp(b));
    for pair in real_poles.chunks_exact(2) {
        pole_pairs.push((Complex64::new(pair[0], 0.0), Complex64::new(pair[1], 0.0)));
    }

    // Poles closest to the unit circle go last
    pole_pairs.sort_by(|x, y| x.0.norm().total_cmp(&y.0.norm()));

    // Every section gets one zero at z = +1 and one at z = -1
    let zeros = (Complex64::new(1.0, 0.0), Complex64::new(-1.0, 0.0));
    let sections: Vec<SecondOrderSection> = pole_pairs
        .into_iter()
        .enumerate()
        .map(|(i, poles)| {
            let g = if i == 0 { gain } else { 1.0 };
            SecondOrderSection::from_roots(zeros, poles, g)
        })
        .collect();

    if !gain.is_finite() || sections.iter().any(|s| !s.is_finite()) {
        return Err(HrvError::NumericInstability(
            "non-finite filter coefficients".to_string(),
        ));
    }

    log::trace!(
        "designed {}-section band-pass {:.3}-{:.3} Hz at {} Hz (gain {:e})",
        sections.len(),
        spec.low_hz,
        spec.high_hz,
        spec.fs,
        gain
    );

    Ok(sections)
}
