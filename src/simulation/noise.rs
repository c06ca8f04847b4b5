use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

/// Recording artefacts to layer onto a clean synthetic ECG
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct NoiseConfig {
    pub seed: Option<u64>,
    pub additive: Option<AdditiveNoiseConfig>,
    pub baseline: Option<BaselineWanderConfig>,
    pub powerline: Option<PowerlineConfig>,
    pub respiration: Option<RespirationConfig>,
    pub impulse: Option<ImpulseNoiseConfig>,
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_awgn(mut self, snr_db: f64) -> Self {
        self.additive = Some(AdditiveNoiseConfig { snr_db });
        self
    }

    pub fn with_baseline_wander(mut self, amplitude: f64, freq_hz: f64) -> Self {
        self.baseline = Some(BaselineWanderConfig { amplitude, freq_hz });
        self
    }

    pub fn with_powerline(mut self, amplitude: f64, freq_hz: f64) -> Self {
        self.powerline = Some(PowerlineConfig { amplitude, freq_hz });
        self
    }

    pub fn with_respiration(mut self, depth: f64, rate_hz: f64) -> Self {
        self.respiration = Some(RespirationConfig { depth, rate_hz });
        self
    }

    pub fn with_impulse(mut self, rate_hz: f64, amplitude: f64, duration_samples: usize) -> Self {
        self.impulse = Some(ImpulseNoiseConfig {
            rate_hz,
            amplitude,
            duration_samples,
        });
        self
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct AdditiveNoiseConfig {
    pub snr_db: f64,
}

/// Slow drift of the isoelectric line, as from breathing or electrode motion
#[derive(Clone, Debug, serde::Deserialize)]
pub struct BaselineWanderConfig {
    pub amplitude: f64,
    pub freq_hz: f64,
}

/// Mains interference
#[derive(Clone, Debug, serde::Deserialize)]
pub struct PowerlineConfig {
    pub amplitude: f64,
    pub freq_hz: f64,
}

/// Amplitude modulation of the whole trace by breathing
#[derive(Clone, Debug, serde::Deserialize)]
pub struct RespirationConfig {
    /// Fractional modulation depth, 0.1 = +-10 %
    pub depth: f64,
    pub rate_hz: f64,
}

/// Short motion or electrode-pop spikes
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ImpulseNoiseConfig {
    pub rate_hz: f64,
    pub amplitude: f64,
    pub duration_samples: usize,
}

pub(crate) fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

pub fn signal_power(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|&x| x * x).sum::<f64>() / signal.len() as f64
}

fn apply_additive_noise(signal: &mut [f64], config: &AdditiveNoiseConfig, rng: &mut ChaCha8Rng) {
    let sig_power = signal_power(signal);
    if sig_power == 0.0 {
        return;
    }

    let snr_linear = 10.0_f64.powf(config.snr_db / 10.0);
    let noise_std = (sig_power / snr_linear).sqrt();

    let Ok(normal) = Normal::new(0.0, noise_std) else {
        return;
    };
    for sample in signal.iter_mut() {
        *sample += normal.sample(rng);
    }
}

fn apply_baseline_wander(
    signal: &mut [f64],
    config: &BaselineWanderConfig,
    sample_rate: f64,
    rng: &mut ChaCha8Rng,
) {
    // Main component plus a weaker one at a non-harmonic frequency
    let phi1: f64 = rng.random::<f64>() * 2.0 * PI;
    let phi2: f64 = rng.random::<f64>() * 2.0 * PI;
    for (i, s) in signal.iter_mut().enumerate() {
        let t = i as f64 / sample_rate;
        *s += config.amplitude
            * ((2.0 * PI * config.freq_hz * t + phi1).sin()
                + 0.3 * (2.0 * PI * 0.37 * config.freq_hz * t + phi2).sin());
    }
}

fn apply_powerline(signal: &mut [f64], config: &PowerlineConfig, sample_rate: f64) {
    for (i, s) in signal.iter_mut().enumerate() {
        let t = i as f64 / sample_rate;
        *s += config.amplitude * (2.0 * PI * config.freq_hz * t).sin();
    }
}

fn apply_respiration(signal: &mut [f64], config: &RespirationConfig, sample_rate: f64) {
    for (i, s) in signal.iter_mut().enumerate() {
        let t = i as f64 / sample_rate;
        *s *= 1.0 + config.depth * (2.0 * PI * config.rate_hz * t).sin();
    }
}

fn apply_impulse_noise(
    signal: &mut [f64],
    config: &ImpulseNoiseConfig,
    sample_rate: f64,
    rng: &mut ChaCha8Rng,
) {
    let n = signal.len();
    if n == 0 || config.rate_hz <= 0.0 {
        return;
    }

    let avg_samples_between_impulses = sample_rate / config.rate_hz;

    let mut pos = 0usize;
    loop {
        let interval = (rng.random::<f64>() * 2.0 * avg_samples_between_impulses) as usize;
        pos += interval.max(1);

        if pos >= n {
            break;
        }

        let sign = if rng.random::<bool>() { 1.0 } else { -1.0 };
        let end = (pos + config.duration_samples).min(n);

        for sample in signal[pos..end].iter_mut() {
            *sample += sign * config.amplitude;
        }
    }
}

/// Apply every configured artefact to a copy of `clean_signal`
///
/// Multiplicative effects go first so the additive ones are not modulated.
pub fn apply_noise(clean_signal: &[f64], config: &NoiseConfig, sample_rate: f64) -> Vec<f64> {
    let mut signal = clean_signal.to_vec();
    let mut rng = create_rng(config.seed);

    if let Some(ref respiration) = config.respiration {
        apply_respiration(&mut signal, respiration, sample_rate);
    }

    if let Some(ref additive_config) = config.additive {
        apply_additive_noise(&mut signal, additive_config, &mut rng);
    }

    if let Some(ref baseline) = config.baseline {
        apply_baseline_wander(&mut signal, baseline, sample_rate, &mut rng);
    }

    if let Some(ref powerline) = config.powerline {
        apply_powerline(&mut signal, powerline, sample_rate);
    }

    if let Some(ref impulse_config) = config.impulse {
        apply_impulse_noise(&mut signal, impulse_config, sample_rate, &mut rng);
    }

    signal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean() -> Vec<f64> {
        (0..1000).map(|i| (i as f64 * 0.1).sin()).collect()
    }

    #[test]
    fn test_additive_noise_changes_signal() {
        let config = NoiseConfig::default().with_seed(42).with_awgn(10.0);
        let noisy = apply_noise(&clean(), &config, 1000.0);

        assert_eq!(noisy.len(), 1000);
        assert_ne!(clean(), noisy);
    }

    #[test]
    fn test_seeded_rng_reproducibility() {
        let config = NoiseConfig::default()
            .with_seed(12345)
            .with_awgn(20.0)
            .with_baseline_wander(0.2, 0.3)
            .with_impulse(1.0, 0.5, 3);

        assert_eq!(
            apply_noise(&clean(), &config, 1000.0),
            apply_noise(&clean(), &config, 1000.0)
        );
    }

    #[test]
    fn test_additive_noise_level() {
        let signal: Vec<f64> = (0..20_000).map(|i| (i as f64 * 0.05).sin()).collect();
        let config = NoiseConfig::default().with_seed(9).with_awgn(10.0);
        let noisy = apply_noise(&signal, &config, 1000.0);

        let residual: Vec<f64> = noisy.iter().zip(&signal).map(|(n, s)| n - s).collect();
        let ratio = signal_power(&signal) / signal_power(&residual);
        assert!((ratio - 10.0).abs() < 1.0, "SNR ratio {}", ratio);
    }

    #[test]
    fn test_baseline_wander_is_slow() {
        let config = NoiseConfig::default()
            .with_seed(1)
            .with_baseline_wander(0.5, 0.2);
        let wander = apply_noise(&vec![0.0; 10_000], &config, 1000.0);
        let max_step = wander
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0, f64::max);
        assert!(max_step < 1e-3);
        assert!(wander.iter().any(|v| v.abs() > 0.2));
    }

    #[test]
    fn test_powerline_adds_tone() {
        let config = NoiseConfig::default().with_powerline(0.1, 50.0);
        let hum = apply_noise(&vec![0.0; 1000], &config, 1000.0);
        assert!((signal_power(&hum) - 0.005).abs() < 1e-4);
    }

    #[test]
    fn test_respiration_modulates_amplitude() {
        let config = NoiseConfig::default().with_respiration(0.2, 0.25);
        let modulated = apply_noise(&vec![1.0; 4000], &config, 1000.0);
        let max = modulated.iter().copied().fold(f64::MIN, f64::max);
        let min = modulated.iter().copied().fold(f64::MAX, f64::min);
        assert!((max - 1.2).abs() < 1e-3);
        assert!((min - 0.8).abs() < 1e-3);
    }

    #[test]
    fn test_impulse_noise_adds_spikes() {
        let config = NoiseConfig::default().with_seed(42).with_impulse(10.0, 1.0, 5);
        let noisy = apply_noise(&vec![0.0; 10_000], &config, 1000.0);

        let spike_count = noisy.iter().filter(|&&x| x.abs() > 0.5).count();
        assert!(spike_count > 10);
        assert!(spike_count < 1000);
    }

    #[test]
    fn test_config_from_toml() {
        let config: NoiseConfig = toml::from_str(
            r#"
            seed = 5
            [additive]
            snr_db = 18.0
            [baseline]
            amplitude = 0.3
            freq_hz = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(5));
        assert!(config.additive.is_some());
        assert!(config.powerline.is_none());
    }
}
