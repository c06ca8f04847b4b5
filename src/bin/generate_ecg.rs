use anyhow::{Context, Result};
use clap::Parser;
use rrlorenz::input::{DEFAULT_SKIP_ROWS, save_wav};
use rrlorenz::simulation::{NoiseConfig, RhythmConfig, apply_noise, generate_ecg, seeded_rng};
use rrlorenz::Signal;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "generate_ecg")]
#[command(about = "Generate synthetic ECG recordings with configurable noise")]
struct Args {
    /// TOML noise configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "data/synthetic")]
    output_dir: PathBuf,

    /// Heart rates in bpm: comma-separated (e.g., "60,75") or range (e.g., "50-120:10")
    #[arg(short = 'r', long, default_value = "60,75,90")]
    rates: String,

    /// Number of trials per heart rate
    #[arg(short, long, default_value_t = 1)]
    trials: u32,

    /// Base seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Recording duration in seconds
    #[arg(short, long, default_value_t = 60.0)]
    duration: f64,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 1000)]
    sample_rate: u32,

    /// Standard deviation of RR intervals in seconds
    #[arg(long, default_value_t = 0.03)]
    rr_jitter: f64,

    /// Output filename prefix
    #[arg(long, default_value = "ecg")]
    prefix: String,

    /// Write WAV files instead of text traces
    #[arg(long)]
    wav: bool,

    /// Generate manifest.json
    #[arg(long)]
    manifest: bool,

    /// AWGN SNR in dB (CLI override)
    #[arg(long)]
    snr: Option<f64>,

    /// Baseline wander amplitude (CLI override, 0.3 Hz)
    #[arg(long)]
    baseline: Option<f64>,
}

#[derive(Debug, serde::Serialize)]
struct ManifestEntry {
    file: String,
    heart_rate_bpm: f64,
    trial: u32,
    seed: u64,
    beat_times: Vec<f64>,
}

#[derive(Debug, serde::Serialize)]
struct Manifest {
    sample_rate: u32,
    duration: f64,
    rr_jitter: f64,
    files: Vec<ManifestEntry>,
}

fn parse_rates(s: &str) -> Result<Vec<f64>> {
    if s.contains(':') {
        let (range, step) = s
            .split_once(':')
            .context("Invalid range format. Use 'start-end:step'")?;
        let step: f64 = step.parse().context("Invalid step value")?;
        if step <= 0.0 {
            anyhow::bail!("Step must be positive");
        }
        let (start, end) = range
            .split_once('-')
            .context("Invalid range format. Use 'start-end:step'")?;
        let start: f64 = start.parse().context("Invalid start value")?;
        let end: f64 = end.parse().context("Invalid end value")?;

        let mut rates = Vec::new();
        let mut r = start;
        while r <= end {
            rates.push(r);
            r += step;
        }
        Ok(rates)
    } else {
        s.split(',')
            .map(|p| p.trim().parse::<f64>().context("Invalid heart rate value"))
            .collect()
    }
}

fn build_noise_config(base: &NoiseConfig, args: &Args, seed: u64) -> NoiseConfig {
    let mut config = base.clone().with_seed(seed);
    if let Some(snr) = args.snr {
        config = config.with_awgn(snr);
    }
    if let Some(amplitude) = args.baseline {
        config = config.with_baseline_wander(amplitude, 0.3);
    }
    config
}

/// Write a trace in the text layout the loader expects: a header block,
/// then one `value<TAB>seconds` row per sample
fn write_text(path: &Path, signal: &Signal, heart_rate: f64, seed: u64) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let header = [
        "# rrlorenz synthetic ECG".to_string(),
        format!("# sample_rate_hz\t{}", signal.fs()),
        format!("# samples\t{}", signal.len()),
        format!("# heart_rate_bpm\t{}", heart_rate),
        format!("# seed\t{}", seed),
    ];
    for i in 0..DEFAULT_SKIP_ROWS {
        writeln!(w, "{}", header.get(i).map_or("#", |s| s.as_str()))?;
    }
    for (i, v) in signal.samples().iter().enumerate() {
        writeln!(w, "{:.6}\t{:.3}", v, i as f64 / signal.fs())?;
    }
    w.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    fs::create_dir_all(&args.output_dir).context("Failed to create output directory")?;

    let base_noise = match args.config {
        Some(ref path) => {
            let content = fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        }
        None => NoiseConfig::default(),
    };

    let rates = parse_rates(&args.rates)?;
    let base_seed = args.seed.unwrap_or(0);
    let fs_hz = args.sample_rate as f64;

    let mut manifest_entries = Vec::new();
    let total_files = rates.len() * args.trials as usize;
    let mut file_count = 0;

    for &rate in &rates {
        for trial in 0..args.trials {
            let seed = base_seed + trial as u64 * 1000 + rate as u64;
            let rhythm = RhythmConfig {
                heart_rate_bpm: rate,
                rr_jitter_s: args.rr_jitter,
                ..Default::default()
            };
            let mut rng = seeded_rng(Some(seed));
            let ecg = generate_ecg(fs_hz, args.duration, &rhythm, &mut rng)?;

            let noise = build_noise_config(&base_noise, &args, seed);
            let noisy = Signal::new(apply_noise(ecg.signal.samples(), &noise, fs_hz), fs_hz)?;

            let ext = if args.wav { "wav" } else { "txt" };
            let filename = format!("{}_hr{:03}_t{:02}.{}", args.prefix, rate as i32, trial, ext);
            let filepath = args.output_dir.join(&filename);

            if args.wav {
                save_wav(&filepath, &noisy).context("Failed to write WAV file")?;
            } else {
                write_text(&filepath, &noisy, rate, seed).context("Failed to write text file")?;
            }

            manifest_entries.push(ManifestEntry {
                file: filename,
                heart_rate_bpm: rate,
                trial,
                seed,
                beat_times: ecg.beat_times,
            });

            file_count += 1;
            eprint!("\rGenerating: {}/{}", file_count, total_files);
        }
    }
    eprintln!();

    if args.manifest {
        let manifest = Manifest {
            sample_rate: args.sample_rate,
            duration: args.duration,
            rr_jitter: args.rr_jitter,
            files: manifest_entries,
        };
        let manifest_path = args.output_dir.join("manifest.json");
        let manifest_json =
            serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
        fs::write(&manifest_path, manifest_json).context("Failed to write manifest")?;
        eprintln!("Manifest written to: {}", manifest_path.display());
    }

    eprintln!(
        "Generated {} files in {}",
        total_files,
        args.output_dir.display()
    );
    Ok(())
}
