use realfft::RealFftPlanner;

use crate::constants::SAMPLE_ROUNDING_EPSILON;
use crate::error::{HrvError, Result};
use crate::signal::{Signal, validate_rate};

/// Number of samples a signal of `len` samples at `fs` occupies at `target_rate`
///
/// Rounds down, so an integer-second recording resampled to an integer rate
/// comes out at exactly `seconds * target_rate` samples.
pub fn resampled_len(len: usize, fs: f64, target_rate: f64) -> usize {
    (len as f64 * target_rate / fs + SAMPLE_ROUNDING_EPSILON).floor() as usize
}

/// Resample `signal` to `target_rate` Hz in the frequency domain
///
/// The spectrum is truncated (or zero-padded) at the lower of the two Nyquist
/// frequencies and transformed back at the new length, so content below that
/// frequency is preserved and the duration changes by less than one output
/// sample. The signal is treated as one period of a periodic sequence.
///
/// # Errors
/// `HrvError::InvalidRate` if `target_rate` is not a finite positive number,
/// `HrvError::NumericInstability` if the transform fails or produces
/// non-finite samples.
pub fn resample(signal: &Signal, target_rate: f64) -> Result<Signal> {
    validate_rate(target_rate)?;

    let n_in = signal.len();
    let n_out = resampled_len(n_in, signal.fs(), target_rate);
    if n_in == 0 || n_out == 0 {
        return Signal::new(Vec::new(), target_rate);
    }
    if n_out == n_in {
        return Signal::new(signal.samples().to_vec(), target_rate);
    }

    let mut planner = RealFftPlanner::<f64>::new();

    let r2c = planner.plan_fft_forward(n_in);
    let mut input = signal.samples().to_vec();
    let mut spectrum = r2c.make_output_vec();
    r2c.process(&mut input, &mut spectrum)
        .map_err(|e| HrvError::NumericInstability(format!("forward FFT failed: {}", e)))?;

    let c2r = planner.plan_fft_inverse(n_out);
    let mut resampled = c2r.make_input_vec();

    let kept = n_in.min(n_out);
    let nyquist_bin = kept / 2;
    resampled[..=nyquist_bin].copy_from_slice(&spectrum[..=nyquist_bin]);

    // The shared Nyquist bin stands for both the positive and the negative
    // frequency when the retained length is even
    if kept % 2 == 0 {
        if n_out < n_in {
            resampled[nyquist_bin] *= 2.0;
        } else {
            resampled[nyquist_bin] *= 0.5;
        }
    }

    // A real output needs purely real DC and Nyquist bins
    resampled[0].im = 0.0;
    if n_out % 2 == 0 {
        let last = resampled.len() - 1;
        resampled[last].im = 0.0;
    }

    let mut output = c2r.make_output_vec();
    c2r.process(&mut resampled, &mut output)
        .map_err(|e| HrvError::NumericInstability(format!("inverse FFT failed: {}", e)))?;

    // realfft is unnormalized: 1/n_out for the inverse, n_out/n_in for the rate change
    let scale = 1.0 / n_in as f64;
    for sample in output.iter_mut() {
        *sample *= scale;
    }

    if output.iter().any(|v| !v.is_finite()) {
        return Err(HrvError::NumericInstability(
            "non-finite resampled output".to_string(),
        ));
    }

    log::trace!(
        "resampled {} samples at {} Hz to {} samples at {} Hz",
        n_in,
        signal.fs(),
        n_out,
        target_rate
    );

    Signal::new(output, target_rate)
}
