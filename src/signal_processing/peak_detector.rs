/// Indices of local maxima in `data`
///
/// A sample is a local maximum when it rises strictly above its left
/// neighbour and is not exceeded by its right neighbour. On a flat top only
/// the first sample is reported, and a flat signal has no maxima at all.
/// The end samples are never reported.
pub fn local_maxima(data: &[f64]) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }
    let mut peaks = Vec::new();
    let mut i = 1;
    while i < data.len() - 1 {
        if data[i] > data[i - 1] {
            // Walk across a plateau to see whether it ends by falling
            let mut j = i;
            while j + 1 < data.len() && data[j + 1] == data[i] {
                j += 1;
            }
            if j + 1 < data.len() && data[j + 1] < data[i] {
                peaks.push(i);
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }
    peaks
}

fn window(len: usize, centre: usize, radius: usize) -> (usize, usize) {
    let centre = centre.min(len - 1);
    (centre.saturating_sub(radius), (centre + radius).min(len - 1))
}

/// Index of the largest-magnitude sample within `radius` of `centre`
///
/// Ties resolve to the earliest index. Used to move a detection from the
/// smoothed feature signal onto the matching peak of the underlying trace,
/// whichever way the complex points.
pub fn refine_peak(data: &[f64], centre: usize, radius: usize) -> usize {
    if data.is_empty() {
        return centre;
    }
    let (start, end) = window(data.len(), centre, radius);

    let mut best = start;
    for j in start..=end {
        if data[j].abs() > data[best].abs() {
            best = j;
        }
    }
    best
}

/// Local maxima that are also the largest sample within `radius` of themselves
///
/// Suppresses the ripple a running-sum integrator leaves on a flat envelope
/// top, keeping one peak per bump. Of equal values the earliest wins.
pub fn dominant_maxima(data: &[f64], radius: usize) -> Vec<usize> {
    local_maxima(data)
        .into_iter()
        .filter(|&i| {
            let (start, end) = window(data.len(), i, radius);
            data[start..i].iter().all(|&v| v < data[i])
                && data[i + 1..=end].iter().all(|&v| v <= data[i])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_maxima() {
        let signal = vec![0.3, 0.4, 0.6, 0.7, 0.4, 0.2, 0.3, 0.4, 0.8, 0.3];
        assert_eq!(local_maxima(&signal), vec![3, 8]);
    }

    #[test]
    fn test_local_maxima_plateau() {
        let signal = vec![0.0, 1.0, 1.0, 1.0, 0.0, 2.0, 2.0];
        // The second plateau runs into the end and is not a maximum
        assert_eq!(local_maxima(&signal), vec![1]);
    }

    #[test]
    fn test_local_maxima_flat_and_short() {
        assert!(local_maxima(&[0.0; 100]).is_empty());
        assert!(local_maxima(&[1.0, 2.0]).is_empty());
        assert!(local_maxima(&[]).is_empty());
    }

    #[test]
    fn test_refine_peak() {
        let mut signal = vec![0.0; 100];
        signal[20] = 0.8;
        signal[25] = 0.9;
        signal[50] = 0.7;

        assert_eq!(refine_peak(&signal, 22, 5), 25);
        assert_eq!(refine_peak(&signal, 22, 2), 20);
        assert_eq!(refine_peak(&signal, 48, 10), 50);
        assert_eq!(refine_peak(&signal, 99, 3), 96);
        assert_eq!(refine_peak(&signal, 500, 3), 96);
    }

    #[test]
    fn test_refine_peak_negative_complex() {
        // Inverted complex with a small positive side lobe
        let mut signal = vec![0.0; 40];
        signal[17] = 0.3;
        signal[20] = -1.0;
        signal[23] = 0.2;
        assert_eq!(refine_peak(&signal, 18, 5), 20);
        assert_eq!(refine_peak(&signal, 15, 3), 17);
    }

    #[test]
    fn test_dominant_maxima() {
        // Rounding ripple on a plateau at 5..=9 and a separate bump at 30
        let mut signal = vec![0.0; 40];
        for (i, v) in [(4, 0.5), (5, 1.0), (6, 0.999), (7, 1.0 + 1e-12), (8, 0.998), (9, 1.0)] {
            signal[i] = v;
        }
        signal[30] = 0.3;

        assert_eq!(local_maxima(&signal), vec![5, 7, 9, 30]);
        assert_eq!(dominant_maxima(&signal, 5), vec![7, 30]);
        assert_eq!(dominant_maxima(&signal, 0), local_maxima(&signal));
    }
}
