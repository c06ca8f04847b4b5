#![allow(dead_code)]

use rrlorenz::Signal;

/// Width (standard deviation) of a synthetic R wave in seconds
pub const PULSE_WIDTH_S: f64 = 0.010;

/// Unit-amplitude Gaussian pulses centred on `beat_times`
///
/// `amplitudes` scales individual pulses; missing entries default to 1.
pub fn gaussian_pulse_train(
    fs: f64,
    duration_s: f64,
    beat_times: &[f64],
    amplitudes: &[f64],
) -> Vec<f64> {
    let len = (duration_s * fs).round() as usize;
    let mut samples = vec![0.0; len];
    for (k, &t0) in beat_times.iter().enumerate() {
        let amp = amplitudes.get(k).copied().unwrap_or(1.0);
        let start = ((t0 - 6.0 * PULSE_WIDTH_S) * fs).floor().max(0.0) as usize;
        let end = (((t0 + 6.0 * PULSE_WIDTH_S) * fs).ceil() as usize).min(len);
        for (i, s) in samples.iter_mut().enumerate().take(end).skip(start) {
            let d = (i as f64 / fs - t0) / PULSE_WIDTH_S;
            *s += amp * (-0.5 * d * d).exp();
        }
    }
    samples
}

/// Beat times `start, start + rr, ...` strictly before `duration_s`
pub fn regular_beats(start: f64, rr: f64, duration_s: f64) -> Vec<f64> {
    let mut times = Vec::new();
    let mut k = 0;
    loop {
        let t = start + k as f64 * rr;
        if t >= duration_s {
            break;
        }
        times.push(t);
        k += 1;
    }
    times
}

pub fn signal_from_beats(fs: f64, duration_s: f64, beat_times: &[f64]) -> Signal {
    Signal::new(gaussian_pulse_train(fs, duration_s, beat_times, &[]), fs).unwrap()
}
