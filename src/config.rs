//! Configuration for the RR-interval pipeline.
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! warmup_trim_s = 5.0
//!
//! [detector]
//! refractory_s = 0.3
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HrvError, Result};
use crate::signal_processing::FilterSpec;

/// A span of time given in seconds or milliseconds
///
/// # Parsing formats
/// - `0.4` - seconds (no suffix)
/// - `0.4s` - seconds (explicit)
/// - `400ms` - milliseconds
///
/// # Example
/// ```
/// use rrlorenz::config::TimeSpan;
///
/// let span: TimeSpan = "400ms".parse().unwrap();
/// assert!((span.as_secs() - 0.4).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan(f64);

impl TimeSpan {
    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn from_millis(ms: f64) -> Self {
        Self(ms / 1000.0)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0)
    }
}

impl FromStr for TimeSpan {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(num) = s.strip_suffix("ms") {
            let ms: f64 = num
                .trim()
                .parse()
                .map_err(|_| format!("invalid duration: {}", s))?;
            if !ms.is_finite() || ms < 0.0 {
                return Err("duration must not be negative".to_string());
            }
            return Ok(Self::from_millis(ms));
        }

        let num = s.strip_suffix('s').unwrap_or(s);
        let secs: f64 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid duration: {}", s))?;
        if !secs.is_finite() || secs < 0.0 {
            return Err("duration must not be negative".to_string());
        }
        Ok(Self::from_secs(secs))
    }
}

/// Top-level pipeline configuration
///
/// Use `PipelineConfig::default()` for the standard 0.3-60 Hz conditioning,
/// 128 Hz detection rate, 10 s warm-up trim and 0.4 s refractory period.
///
/// # Example
/// ```
/// use rrlorenz::config::PipelineConfig;
///
/// let mut config = PipelineConfig::default();
/// config.detector.refractory_s = 0.3;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Conditioning band-pass filter
    pub filter: FilterConfig,
    /// Detection sampling rate
    pub resample: ResampleConfig,
    /// Seconds of conditioned signal dropped before detection, to skip
    /// filter transients and electrode settling
    pub warmup_trim_s: f64,
    /// QRS detector tuning
    pub detector: QrsConfig,
}

/// Conditioning band-pass filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Lower cutoff in Hz (baseline wander rejection)
    pub low_hz: f64,
    /// Upper cutoff in Hz (noise rejection)
    pub high_hz: f64,
    /// Butterworth order; the zero-phase application doubles it
    pub order: usize,
}

/// Resampling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Rate the detector runs at, in Hz
    pub target_rate: f64,
}

/// QRS detector configuration
///
/// Thresholds follow the usual signal-level / noise-level scheme:
/// `threshold = noise + threshold_fraction * (signal - noise)`, with both
/// levels tracked by exponential averages of classified peaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrsConfig {
    /// Minimum time between two beats in seconds
    pub refractory_s: f64,
    /// Length of the initial threshold-learning segment in seconds
    pub learning_window_s: f64,
    /// Moving-window integrator width in seconds (about one QRS duration)
    pub integration_window_s: f64,
    /// Half-width of the window used to place a beat on the trace peak
    pub peak_search_s: f64,
    /// Position of the threshold between noise and signal level (0-1)
    pub threshold_fraction: f64,
    /// Weight of a new beat amplitude in the signal-level average
    pub signal_weight: f64,
    /// Weight of a new noise-peak amplitude in the noise-level average
    pub noise_weight: f64,
    /// A gap longer than this multiple of the mean RR interval triggers search-back
    pub search_back_factor: f64,
    /// Threshold multiplier applied during search-back (0-1)
    pub search_back_ratio: f64,
    /// Weight of a beat recovered by search-back in the signal-level average
    pub search_back_weight: f64,
    /// Number of recent RR intervals averaged for the search-back window
    pub rr_history_len: usize,
    /// RR interval assumed for search-back until one has been measured
    pub rr_init_s: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            resample: ResampleConfig::default(),
            warmup_trim_s: 10.0,
            detector: QrsConfig::default(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            low_hz: 0.3,
            high_hz: 60.0,
            order: 4,
        }
    }
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self { target_rate: 128.0 }
    }
}

impl Default for QrsConfig {
    fn default() -> Self {
        Self {
            refractory_s: 0.4,
            learning_window_s: 8.0,
            integration_window_s: 0.150,
            peak_search_s: 0.075,
            threshold_fraction: 0.25,
            signal_weight: 0.125,
            noise_weight: 0.125,
            search_back_factor: 1.66,
            search_back_ratio: 0.5,
            search_back_weight: 0.25,
            rr_history_len: 8,
            rr_init_s: 0.8,
        }
    }
}

impl FilterConfig {
    /// Band-pass specification for a signal sampled at `fs`
    pub fn spec(&self, fs: f64) -> Result<FilterSpec> {
        FilterSpec::new(self.low_hz, self.high_hz, self.order, fs)
    }
}

impl QrsConfig {
    /// Default tuning with a different refractory period
    pub fn with_refractory(refractory_s: f64) -> Self {
        Self {
            refractory_s,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, v: f64) -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(HrvError::Config(format!("{} must be positive, got {}", name, v)))
            }
        }
        fn fraction(name: &str, v: f64) -> Result<()> {
            if v.is_finite() && v > 0.0 && v <= 1.0 {
                Ok(())
            } else {
                Err(HrvError::Config(format!("{} must be in (0, 1], got {}", name, v)))
            }
        }

        positive("refractory_s", self.refractory_s)?;
        positive("integration_window_s", self.integration_window_s)?;
        positive("rr_init_s", self.rr_init_s)?;
        if !self.learning_window_s.is_finite() || self.learning_window_s < 0.0 {
            return Err(HrvError::Config(format!(
                "learning_window_s must not be negative, got {}",
                self.learning_window_s
            )));
        }
        if !self.peak_search_s.is_finite() || self.peak_search_s < 0.0 {
            return Err(HrvError::Config(format!(
                "peak_search_s must not be negative, got {}",
                self.peak_search_s
            )));
        }
        fraction("threshold_fraction", self.threshold_fraction)?;
        fraction("signal_weight", self.signal_weight)?;
        fraction("noise_weight", self.noise_weight)?;
        fraction("search_back_ratio", self.search_back_ratio)?;
        fraction("search_back_weight", self.search_back_weight)?;
        if !self.search_back_factor.is_finite() || self.search_back_factor <= 1.0 {
            return Err(HrvError::Config(format!(
                "search_back_factor must exceed 1, got {}",
                self.search_back_factor
            )));
        }
        if self.rr_history_len == 0 {
            return Err(HrvError::Config(
                "rr_history_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl PipelineConfig {
    /// Check everything that does not depend on the input sampling rate
    ///
    /// The cutoffs are checked against the input Nyquist frequency once a
    /// signal arrives.
    pub fn validate(&self) -> Result<()> {
        let f = &self.filter;
        if !f.low_hz.is_finite() || !f.high_hz.is_finite() || f.low_hz <= 0.0 || f.low_hz >= f.high_hz
        {
            return Err(HrvError::InvalidSpec(format!(
                "need 0 < low < high, got {}-{} Hz",
                f.low_hz, f.high_hz
            )));
        }
        if f.order < 1 {
            return Err(HrvError::InvalidSpec("order must be at least 1".to_string()));
        }
        if !self.resample.target_rate.is_finite() || self.resample.target_rate <= 0.0 {
            return Err(HrvError::InvalidRate(self.resample.target_rate));
        }
        if !self.warmup_trim_s.is_finite() || self.warmup_trim_s < 0.0 {
            return Err(HrvError::Config(format!(
                "warmup_trim_s must not be negative, got {}",
                self.warmup_trim_s
            )));
        }
        self.detector.validate()
    }

    /// Parse a TOML document; missing fields keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| HrvError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            HrvError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_span_plain_seconds() {
        let span: TimeSpan = "0.4".parse().unwrap();
        assert!((span.as_secs() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_time_span_suffixes() {
        let span: TimeSpan = "0.4s".parse().unwrap();
        assert!((span.as_secs() - 0.4).abs() < 1e-12);

        let span: TimeSpan = "250ms".parse().unwrap();
        assert!((span.as_secs() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_time_span_invalid() {
        assert!("abc".parse::<TimeSpan>().is_err());
        assert!("-1s".parse::<TimeSpan>().is_err());
        assert!("ms".parse::<TimeSpan>().is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.filter.low_hz, 0.3);
        assert_eq!(config.filter.high_hz, 60.0);
        assert_eq!(config.resample.target_rate, 128.0);
        assert_eq!(config.warmup_trim_s, 10.0);
        assert_eq!(config.detector.refractory_s, 0.4);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            warmup_trim_s = 5.0

            [detector]
            refractory_s = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(config.warmup_trim_s, 5.0);
        assert_eq!(config.detector.refractory_s, 0.3);
        assert_eq!(config.detector.learning_window_s, 8.0);
        assert_eq!(config.filter, FilterConfig::default());
    }

    #[test]
    fn test_invalid_toml_values() {
        assert!(matches!(
            PipelineConfig::from_toml_str("[filter]\nlow_hz = 70.0\n"),
            Err(HrvError::InvalidSpec(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("[resample]\ntarget_rate = 0.0\n"),
            Err(HrvError::InvalidRate(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("[detector]\nsearch_back_factor = 0.5\n"),
            Err(HrvError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("[detector]\nrr_init_s = 0.0\n"),
            Err(HrvError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("warmup_trim_s = \"soon\"\n"),
            Err(HrvError::Config(_))
        ));
    }

    #[test]
    fn test_filter_spec_from_config() {
        let spec = FilterConfig::default().spec(1000.0).unwrap();
        assert_eq!(spec.order, 4);
        assert!(FilterConfig::default().spec(100.0).is_err());
    }
}
