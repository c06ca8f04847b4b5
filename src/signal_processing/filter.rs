use super::butterworth::SecondOrderSection;

/// Common trait for sample-by-sample filters
///
/// Implemented by `SosCascade`.
pub trait Filter {
    /// Process a single sample through the filter
    fn process(&mut self, sample: f64) -> f64;

    /// Process a buffer of samples in-place
    fn process_buffer(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}

/// Cascade of biquads in direct form II transposed
pub struct SosCascade<'a> {
    sections: &'a [SecondOrderSection],
    state: Vec<[f64; 2]>,
}

impl<'a> SosCascade<'a> {
    /// Create a cascade starting from rest
    pub fn new(sections: &'a [SecondOrderSection]) -> Self {
        Self {
            sections,
            state: vec![[0.0; 2]; sections.len()],
        }
    }

    /// Create a cascade already settled on a constant input of `level`
    ///
    /// `unit_state` is the per-section steady state for a unit step, as
    /// returned by `steady_state`.
    pub fn settled(sections: &'a [SecondOrderSection], unit_state: &[[f64; 2]], level: f64) -> Self {
        Self {
            sections,
            state: unit_state
                .iter()
                .map(|s| [s[0] * level, s[1] * level])
                .collect(),
        }
    }
}

impl Filter for SosCascade<'_> {
    fn process(&mut self, sample: f64) -> f64 {
        let mut x = sample;
        for (s, z) in self.sections.iter().zip(self.state.iter_mut()) {
            let y = s.b[0] * x + z[0];
            z[0] = s.b[1] * x - s.a[1] * y + z[1];
            z[1] = s.b[2] * x - s.a[2] * y;
            x = y;
        }
        x
    }
}

/// Per-section internal state of a cascade that has settled on a unit step.
///
/// Each section sees the step scaled by the DC gain of the sections before it.
pub fn steady_state(sections: &[SecondOrderSection]) -> Vec<[f64; 2]> {
    let mut scale = 1.0;
    sections
        .iter()
        .map(|s| {
            let g = s.dc_gain();
            let z2 = s.b[2] - s.a[2] * g;
            let z1 = s.b[1] - s.a[1] * g + z2;
            let state = [scale * z1, scale * z2];
            scale *= g;
            state
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_processing::butterworth::{FilterSpec, design_bandpass};
    use approx::assert_relative_eq;

    fn lowpass_section() -> SecondOrderSection {
        // y = 0.5 x + 0.5 y[-1]: unity DC gain
        SecondOrderSection {
            b: [0.5, 0.0, 0.0],
            a: [1.0, -0.5, 0.0],
        }
    }

    #[test]
    fn test_cascade_impulse_response() {
        let sections = [lowpass_section()];
        let mut cascade = SosCascade::new(&sections);
        let mut buffer = vec![1.0, 0.0, 0.0, 0.0];
        cascade.process_buffer(&mut buffer);
        assert_relative_eq!(buffer[0], 0.5);
        assert_relative_eq!(buffer[1], 0.25);
        assert_relative_eq!(buffer[2], 0.125);
        assert_relative_eq!(buffer[3], 0.0625);
    }

    #[test]
    fn test_settled_cascade_has_no_transient() {
        let sections = [lowpass_section(), lowpass_section()];
        let zi = steady_state(&sections);
        let mut cascade = SosCascade::settled(&sections, &zi, 3.0);
        for _ in 0..10 {
            assert_relative_eq!(cascade.process(3.0), 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_settled_bandpass_outputs_zero_for_constant() {
        let spec = FilterSpec::new(0.5, 40.0, 4, 250.0).unwrap();
        let sections = design_bandpass(&spec).unwrap();
        let zi = steady_state(&sections);
        let mut cascade = SosCascade::settled(&sections, &zi, 2.0);
        for _ in 0..100 {
            assert!(cascade.process(2.0).abs() < 1e-9);
        }
    }
}
