use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::signal::LorenzPoint;

/// Name a recording's outputs after its file name up to the first dot
pub fn recording_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    match name.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ if name.is_empty() => "recording".to_string(),
        _ => name,
    }
}

pub fn rri_path(out_dir: &Path, stem: &str) -> PathBuf {
    out_dir.join("csv").join(format!("{}.csv", stem))
}

pub fn lorenz_path(out_dir: &Path, stem: &str) -> PathBuf {
    out_dir.join("lorenz").join(format!("{}.csv", stem))
}

/// One interval per line, in seconds with six decimals
pub fn write_rri<W: Write>(mut writer: W, rri: &[f64]) -> io::Result<()> {
    for rr in rri {
        writeln!(writer, "{:.6}", rr)?;
    }
    writer.flush()
}

/// Lorenz points as `x,y` rows under a header
pub fn write_lorenz<W: Write>(mut writer: W, points: &[LorenzPoint]) -> io::Result<()> {
    writeln!(writer, "x,y")?;
    for p in points {
        writeln!(writer, "{:.6},{:.6}", p.x, p.y)?;
    }
    writer.flush()
}

fn create(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Write `rri` to `<out_dir>/csv/<stem>.csv`, creating directories as needed
pub fn save_rri(out_dir: &Path, stem: &str, rri: &[f64]) -> io::Result<PathBuf> {
    let path = rri_path(out_dir, stem);
    write_rri(create(&path)?, rri)?;
    Ok(path)
}

/// Write `points` to `<out_dir>/lorenz/<stem>.csv`, creating directories as needed
pub fn save_lorenz(out_dir: &Path, stem: &str, points: &[LorenzPoint]) -> io::Result<PathBuf> {
    let path = lorenz_path(out_dir, stem);
    write_lorenz(create(&path)?, points)?;
    Ok(path)
}
