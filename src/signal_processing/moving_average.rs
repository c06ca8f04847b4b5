/// Moving average over a sliding window of samples
///
/// Computes the arithmetic mean of the last N values. Keeps a circular buffer
/// and a running sum, so each update costs O(1). Until the window has filled
/// the mean is taken over the values seen so far.
pub struct MovingAverage {
    buffer: Vec<f64>,
    index: usize,
    filled: bool,
    sum: f64,
}

impl MovingAverage {
    /// Create a new moving average
    ///
    /// # Arguments
    /// * `window_size` - Number of samples to average (at least 1)
    pub fn new(window_size: usize) -> Self {
        Self {
            buffer: vec![0.0; window_size.max(1)],
            index: 0,
            filled: false,
            sum: 0.0,
        }
    }

    /// Add a new value and return the updated average
    pub fn add(&mut self, value: f64) -> f64 {
        self.sum += value - self.buffer[self.index];
        self.buffer[self.index] = value;
        self.index = (self.index + 1) % self.buffer.len();

        if self.index == 0 {
            self.filled = true;
        }

        self.average()
    }

    /// Get the current average without adding a new value
    pub fn average(&self) -> f64 {
        let count = if self.filled {
            self.buffer.len()
        } else {
            self.index.max(1)
        };
        self.sum / count as f64
    }
}

/// Moving-window integration centred on each sample
///
/// Output `i` is the mean of the `width` input samples around `i`, so a
/// symmetric bump stays where it was instead of being delayed by half the
/// window. Samples beyond either end count as zero.
pub fn centered_moving_average(data: &[f64], width: usize) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let width = width.max(1);
    if width == 1 {
        return data.to_vec();
    }

    let lead = (width - 1) / 2;
    let mut ma = MovingAverage::new(width);
    // Prime with zeros so partial windows at the start average over `width`
    for _ in 0..width - 1 {
        ma.add(0.0);
    }

    let tail = std::iter::repeat_n(0.0, lead);
    let mut out = Vec::with_capacity(data.len());
    for (i, value) in data.iter().copied().chain(tail).enumerate() {
        let avg = ma.add(value);
        if i >= lead {
            out.push(avg);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_moving_average() {
        let mut ma = MovingAverage::new(3);

        assert_relative_eq!(ma.add(1.0), 1.0);
        assert_relative_eq!(ma.add(2.0), 1.5);
        assert_relative_eq!(ma.add(3.0), 2.0);
        assert_relative_eq!(ma.add(4.0), 3.0); // (2+3+4)/3
        assert_relative_eq!(ma.add(5.0), 4.0); // (3+4+5)/3
    }

    #[test]
    fn test_centered_keeps_length() {
        let data = vec![1.0; 17];
        for width in [1, 2, 3, 8, 19, 40] {
            assert_eq!(centered_moving_average(&data, width).len(), data.len());
        }
        assert!(centered_moving_average(&[], 5).is_empty());
    }

    #[test]
    fn test_centered_impulse_is_not_delayed() {
        let mut data = vec![0.0; 21];
        data[10] = 5.0;
        let out = centered_moving_average(&data, 5);
        for (i, &v) in out.iter().enumerate() {
            let expected = if (8..=12).contains(&i) { 1.0 } else { 0.0 };
            assert_relative_eq!(v, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_centered_edges_average_over_full_width() {
        let data = vec![3.0; 6];
        let out = centered_moving_average(&data, 3);
        assert_relative_eq!(out[0], 2.0); // (0 + 3 + 3) / 3
        assert_relative_eq!(out[2], 3.0);
        assert_relative_eq!(out[5], 2.0);
    }
}
