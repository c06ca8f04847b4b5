pub mod generate;

pub use generate::{gaussian_pulse_train, regular_beats, signal_from_beats};
