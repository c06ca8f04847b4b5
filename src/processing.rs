use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::hrv;
use crate::qrs::QrsDetector;
use crate::signal::{Beat, LorenzPoint, Signal};
use crate::signal_processing::{BandpassFilter, resample};

/// Everything one pipeline run produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    /// Filtered, resampled and trimmed trace the beats index into
    pub conditioned: Signal,
    pub beats: Vec<Beat>,
    /// RR intervals in seconds
    pub rri: Vec<f64>,
    pub lorenz: Vec<LorenzPoint>,
}

/// ECG to RR interval pipeline
///
/// Band-pass filter, resample, drop the filter warm-up, detect beats, then
/// derive RR intervals and Lorenz points. Holds no state between runs.
pub struct RriPipeline {
    config: PipelineConfig,
    detector: QrsDetector,
}

impl RriPipeline {
    /// Create a pipeline
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid. The filter band is
    /// checked against the input rate again on each run.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let detector = QrsDetector::new(config.detector.clone())?;
        Ok(Self { config, detector })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, signal: &Signal) -> Result<PipelineOutput> {
        let filter = BandpassFilter::new(self.config.filter.spec(signal.fs())?)?;
        let filtered = filter.apply(signal)?;
        log::debug!(
            "filtered {} samples at {} Hz ({} sections)",
            filtered.len(),
            filtered.fs(),
            filter.sections().len()
        );

        let resampled = resample(&filtered, self.config.resample.target_rate)?;
        log::debug!(
            "resampled to {} samples at {} Hz",
            resampled.len(),
            resampled.fs()
        );

        if resampled.duration() <= self.config.warmup_trim_s {
            log::warn!(
                "recording of {:.1}s is not longer than the {:.1}s warm-up trim",
                resampled.duration(),
                self.config.warmup_trim_s
            );
        }
        let conditioned = resampled.trim_start(self.config.warmup_trim_s);

        let beats = self.detector.detect(&conditioned);
        let rri = hrv::compute(&beats, conditioned.fs());
        let lorenz = hrv::project(&rri);
        log::debug!(
            "{} beats, {} intervals, {} Lorenz points",
            beats.len(),
            rri.len(),
            lorenz.len()
        );

        Ok(PipelineOutput {
            conditioned,
            beats,
            rri,
            lorenz,
        })
    }
}
