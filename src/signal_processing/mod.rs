pub mod butterworth;
pub mod filter;
pub mod filters;
pub mod moving_average;
pub mod peak_detector;
pub mod resample;

pub use butterworth::{FilterSpec, SecondOrderSection, design_bandpass, frequency_response};
pub use filter::{Filter, SosCascade};
pub use filters::BandpassFilter;
pub use moving_average::{MovingAverage, centered_moving_average};
pub use peak_detector::{dominant_maxima, local_maxima, refine_peak};
pub use resample::{resample, resampled_len};
