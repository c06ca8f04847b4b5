//! Loading raw ECG traces
//!
//! Two formats are read: delimited text exports, where the trace is the first
//! column after a fixed header block, and WAV files, where the trace is one
//! channel and the sampling rate comes from the file.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{HrvError, Result};
use crate::signal::Signal;

/// Header lines in the text exports the pipeline was built for
pub const DEFAULT_SKIP_ROWS: usize = 13;

/// How to turn a file into a [`Signal`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    /// Sampling rate of text traces; WAV files carry their own
    pub fs: f64,
    /// Header lines to skip in text traces
    pub skip_rows: usize,
    /// Channel to take from multi-channel WAV files
    pub channel: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            fs: 1000.0,
            skip_rows: DEFAULT_SKIP_ROWS,
            channel: 0,
        }
    }
}

/// Load a trace, picking the reader from the file extension
pub fn load<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Signal> {
    let path = path.as_ref();
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

    if is_wav {
        load_wav(path, options.channel)
    } else {
        load_text(path, options.skip_rows, options.fs)
    }
}

/// Load the first column of a delimited text trace
///
/// # Errors
/// `HrvError::Load` if the file cannot be read or a value does not parse,
/// `HrvError::InvalidRate` for a bad `fs`.
pub fn load_text<P: AsRef<Path>>(path: P, skip_rows: usize, fs: f64) -> Result<Signal> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| HrvError::Load(format!("{}: {}", path.display(), e)))?;
    let signal = parse_text(BufReader::new(file), skip_rows, fs)
        .map_err(|e| match e {
            HrvError::Load(msg) => HrvError::Load(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
    log::debug!(
        "loaded {} samples ({:.1}s) from {}",
        signal.len(),
        signal.duration(),
        path.display()
    );
    Ok(signal)
}

/// Parse a delimited text trace
///
/// After `skip_rows` header lines, each non-blank line contributes its first
/// field. Fields are separated by tabs, commas, semicolons or spaces.
pub fn parse_text<R: Read>(reader: R, skip_rows: usize, fs: f64) -> Result<Signal> {
    let mut samples = Vec::new();

    for (lineno, line) in BufReader::new(reader).lines().enumerate().skip(skip_rows) {
        let line = line.map_err(|e| HrvError::Load(e.to_string()))?;
        let Some(field) = line
            .split(|c: char| c == '\t' || c == ',' || c == ';' || c.is_whitespace())
            .find(|f| !f.is_empty())
        else {
            continue;
        };

        let value: f64 = field.parse().map_err(|_| {
            HrvError::Load(format!("line {}: cannot parse '{}'", lineno + 1, field))
        })?;
        if !value.is_finite() {
            return Err(HrvError::Load(format!(
                "line {}: non-finite sample '{}'",
                lineno + 1,
                field
            )));
        }
        samples.push(value);
    }

    Signal::new(samples, fs)
}

/// Load one channel of a WAV file
///
/// Integer samples are scaled to [-1, 1).
pub fn load_wav<P: AsRef<Path>>(path: P, channel: usize) -> Result<Signal> {
    let path = path.as_ref();
    let load_err = |e: hound::Error| HrvError::Load(format!("{}: {}", path.display(), e));

    let reader = WavReader::open(path).map_err(load_err)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channel >= channels {
        return Err(HrvError::Load(format!(
            "{}: channel {} requested but file has {}",
            path.display(),
            channel,
            channels
        )));
    }

    let interleaved = read_samples(reader, &spec).map_err(load_err)?;
    let samples: Vec<f64> = interleaved
        .into_iter()
        .skip(channel)
        .step_by(channels)
        .collect();

    log::debug!(
        "loaded {} samples at {} Hz from channel {} of {}",
        samples.len(),
        spec.sample_rate,
        channel,
        path.display()
    );
    Signal::new(samples, spec.sample_rate as f64)
}

fn read_samples<R: Read>(
    mut reader: WavReader<R>,
    spec: &WavSpec,
) -> std::result::Result<Vec<f64>, hound::Error> {
    match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect(),
        SampleFormat::Int => {
            let max_val = 2_i64.pow(spec.bits_per_sample as u32 - 1) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / max_val))
                .collect()
        }
    }
}

/// Write a signal as a mono 32-bit float WAV file
///
/// The rate is rounded to whole Hz, which is all the format stores.
pub fn save_wav<P: AsRef<Path>>(path: P, signal: &Signal) -> std::result::Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: signal.fs().round() as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in signal.samples() {
        writer.write_sample(sample as f32)?;
    }
    writer.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn header(rows: usize) -> String {
        (0..rows).map(|i| format!("# header {}\n", i)).collect()
    }

    #[test]
    fn test_parse_text_takes_first_column() {
        let text = format!("{}0.5\t1\n-0.25\t2\n\n1e-3\t3\n", header(13));
        let signal = parse_text(text.as_bytes(), 13, 1000.0).unwrap();
        assert_eq!(signal.samples(), &[0.5, -0.25, 1e-3]);
        assert_eq!(signal.fs(), 1000.0);
    }

    #[test]
    fn test_parse_text_delimiters() {
        let text = "1.0,9\n2.0;9\n  3.0  9\n4.0\n";
        let signal = parse_text(text.as_bytes(), 0, 250.0).unwrap();
        assert_eq!(signal.samples(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_parse_text_reports_bad_line() {
        let text = format!("{}0.5\nabc\n", header(2));
        match parse_text(text.as_bytes(), 2, 1000.0) {
            Err(HrvError::Load(msg)) => assert!(msg.contains("line 4"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse_text("NaN\n".as_bytes(), 0, 1000.0),
            Err(HrvError::Load(_))
        ));
    }

    #[test]
    fn test_parse_text_header_only_is_empty() {
        let signal = parse_text(header(13).as_bytes(), 13, 1000.0).unwrap();
        assert!(signal.is_empty());
    }

    #[test]
    fn test_parse_text_rejects_bad_rate() {
        assert!(matches!(
            parse_text("1.0\n".as_bytes(), 0, 0.0),
            Err(HrvError::InvalidRate(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_text("/nonexistent/trace.txt", 13, 1000.0),
            Err(HrvError::Load(_))
        ));
    }

    #[test]
    fn test_wav_round_trip() {
        let path = std::env::temp_dir().join(format!("rrlorenz_input_{}.wav", std::process::id()));
        let signal = Signal::new((0..500).map(|i| (i as f64 / 50.0).sin()).collect(), 250.0).unwrap();
        save_wav(&path, &signal).unwrap();

        let loaded = load(&path, &LoadOptions::default()).unwrap();
        assert_eq!(loaded.fs(), 250.0);
        assert_eq!(loaded.len(), 500);
        for (a, b) in loaded.samples().iter().zip(signal.samples()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6);
        }

        assert!(matches!(load_wav(&path, 1), Err(HrvError::Load(_))));
        std::fs::remove_file(&path).unwrap();
    }
}
