use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use std::path::{Path, PathBuf};
use std::thread;

use rrlorenz::config::{PipelineConfig, TimeSpan};
use rrlorenz::input::{self, DEFAULT_SKIP_ROWS, LoadOptions};
use rrlorenz::output::{
    OutputFormat, RecordingSummary, create_formatter, display_name, recording_stem, save_lorenz,
    save_rri,
};
use rrlorenz::RriPipeline;

#[derive(Parser, Debug)]
#[command(name = "rrlorenz")]
#[command(about = "Extract RR intervals and Lorenz plots from raw ECG recordings", long_about = None)]
struct Args {
    /// ECG recordings: delimited text (first column) or WAV
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Sampling rate of text recordings in Hz
    #[arg(long, default_value_t = 1000.0)]
    fs: f64,

    /// Header lines to skip in text recordings
    #[arg(long, default_value_t = DEFAULT_SKIP_ROWS)]
    skip_rows: usize,

    /// Channel to read from WAV recordings
    #[arg(long, default_value_t = 0)]
    channel: usize,

    /// Output directory; RR intervals go to csv/, Lorenz points to lorenz/
    #[arg(short, long, default_value = "./data")]
    out_dir: PathBuf,

    /// TOML pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Refractory period (e.g., "0.4", "400ms")
    #[arg(long)]
    refractory: Option<TimeSpan>,

    /// Warm-up trim after filtering (e.g., "10", "10s")
    #[arg(long)]
    trim: Option<TimeSpan>,

    /// Resampling rate in Hz
    #[arg(long)]
    target_rate: Option<f64>,

    /// Band-pass lower cutoff in Hz
    #[arg(long)]
    low: Option<f64>,

    /// Band-pass upper cutoff in Hz
    #[arg(long)]
    high: Option<f64>,

    /// Summary format: text, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Worker threads (default: one per CPU, at most one per file)
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match args.config {
        Some(ref path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(refractory) = args.refractory {
        config.detector.refractory_s = refractory.as_secs();
    }
    if let Some(trim) = args.trim {
        config.warmup_trim_s = trim.as_secs();
    }
    if let Some(rate) = args.target_rate {
        config.resample.target_rate = rate;
    }
    if let Some(low) = args.low {
        config.filter.low_hz = low;
    }
    if let Some(high) = args.high {
        config.filter.high_hz = high;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = build_config(&args)?;
    let options = LoadOptions {
        fs: args.fs,
        skip_rows: args.skip_rows,
        channel: args.channel,
    };

    let jobs = args
        .jobs
        .unwrap_or_else(|| thread::available_parallelism().map_or(1, |n| n.get()))
        .clamp(1, args.files.len().max(1));
    log::info!(
        "processing {} recordings on {} workers",
        args.files.len(),
        jobs
    );

    let results = process_all(&args.files, &config, &options, &args.out_dir, jobs)?;

    let formatter = create_formatter(args.format, args.verbose > 0);
    println!("{}", formatter.format(&results));

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} recordings failed", failed, results.len());
    }
    Ok(())
}

/// Process every file on `jobs` worker threads
///
/// Each worker owns its pipeline. Results come back over a channel tagged
/// with the input position and are returned in input order.
fn process_all(
    files: &[PathBuf],
    config: &PipelineConfig,
    options: &LoadOptions,
    out_dir: &Path,
    jobs: usize,
) -> Result<Vec<RecordingSummary>> {
    let (job_tx, job_rx) = bounded::<(usize, &PathBuf)>(jobs * 2);
    let (result_tx, result_rx) = bounded::<(usize, RecordingSummary)>(jobs * 2);

    let mut results: Vec<Option<RecordingSummary>> = vec![None; files.len()];

    thread::scope(|scope| -> Result<()> {
        for _ in 0..jobs {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let pipeline = RriPipeline::new(config.clone())?;
            scope.spawn(move || {
                for (index, path) in job_rx {
                    let summary = process_file(path, &pipeline, options, out_dir)
                        .unwrap_or_else(|e| {
                            log::error!("{}: {:#}", path.display(), e);
                            RecordingSummary::failed(&display_name(path), format!("{:#}", e))
                        });
                    if result_tx.send((index, summary)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        scope.spawn(move || {
            for job in files.iter().enumerate() {
                if job_tx.send(job).is_err() {
                    break;
                }
            }
        });

        for (index, summary) in result_rx {
            results[index] = Some(summary);
        }
        Ok(())
    })?;

    Ok(results.into_iter().flatten().collect())
}

fn process_file(
    path: &Path,
    pipeline: &RriPipeline,
    options: &LoadOptions,
    out_dir: &Path,
) -> Result<RecordingSummary> {
    let signal = input::load(path, options)?;
    let output = pipeline.run(&signal)?;

    let stem = recording_stem(path);
    let rri_path = save_rri(out_dir, &stem, &output.rri)
        .with_context(|| format!("Failed to write RR intervals for {}", stem))?;
    let lorenz_path = save_lorenz(out_dir, &stem, &output.lorenz)
        .with_context(|| format!("Failed to write Lorenz points for {}", stem))?;
    log::info!(
        "{}: {} beats -> {}, {}",
        path.display(),
        output.beats.len(),
        rri_path.display(),
        lorenz_path.display()
    );

    Ok(RecordingSummary::for_path(path, &output))
}
