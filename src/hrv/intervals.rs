use crate::signal::Beat;

/// RR intervals in seconds between consecutive beats
///
/// Beat indices are converted to time at `fs`, the rate of the signal the
/// beats were detected in. Fewer than two beats give no intervals.
pub fn compute(beats: &[Beat], fs: f64) -> Vec<f64> {
    let rri: Vec<f64> = beats
        .windows(2)
        .map(|pair| (pair[1].index as f64 - pair[0].index as f64) / fs)
        .collect();

    debug_assert!(
        rri.iter().all(|&rr| rr > 0.0),
        "beats must be strictly increasing"
    );

    rri
}
