//! QRS complex detection on a conditioned ECG trace

mod detector;
mod features;
mod state;

pub use detector::{Decision, QrsDetector, detect};
pub use features::{derivative, detection_feature};
pub use state::{DetectorPhase, DetectorState, RrHistory, ThresholdLevels};
