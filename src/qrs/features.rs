use crate::signal::seconds_to_samples;
use crate::signal_processing::centered_moving_average;

/// Central-difference slope, one-sided at the ends
pub fn derivative(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    data[1] - data[0]
                } else if i == n - 1 {
                    data[n - 1] - data[n - 2]
                } else {
                    0.5 * (data[i + 1] - data[i - 1])
                }
            })
            .collect(),
    }
}

/// QRS energy envelope used for detection
///
/// Slope, squared, then averaged over a window about one QRS complex wide.
/// Every step is centred, so envelope peaks stay aligned with the trace.
pub fn detection_feature(trace: &[f64], fs: f64, integration_window_s: f64) -> Vec<f64> {
    let slope = derivative(trace);
    let energy: Vec<f64> = slope.iter().map(|d| d * d).collect();
    let width = seconds_to_samples(integration_window_s, fs).max(1);
    centered_moving_average(&energy, width)
}
