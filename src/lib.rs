pub mod config;
pub mod constants;
pub mod error;
pub mod hrv;
pub mod input;
pub mod output;
pub mod processing;
pub mod qrs;
pub mod signal;
pub mod signal_processing;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::PipelineConfig;
pub use error::{HrvError, Result};
pub use processing::{PipelineOutput, RriPipeline};
pub use signal::{Beat, LorenzPoint, Signal};
