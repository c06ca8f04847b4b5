use super::{Formatter, RecordingSummary};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

fn or_dash(value: Option<f64>, precision: usize) -> String {
    value.map_or("-".to_string(), |v| format!("{:.*}", precision, v))
}

impl Formatter for TextFormatter {
    fn format(&self, summaries: &[RecordingSummary]) -> String {
        let mut lines = Vec::with_capacity(summaries.len() + 2);
        if self.verbose {
            lines.push(format!(
                "{:<40} {:>8} {:>6} {:>8} {:>8} {:>8} {:>8} {:>6} {:>8} {:>8}",
                "File", "Seconds", "Beats", "RRI", "Std", "Min", "Max", "BPM", "SD1", "SD2"
            ));
            lines.push("-".repeat(115));
        } else {
            lines.push(format!(
                "{:<40} {:>6} {:>8} {:>8} {:>6}",
                "File", "Beats", "RRI", "Std", "BPM"
            ));
            lines.push("-".repeat(72));
        }

        for s in summaries {
            if let Some(ref err) = s.error {
                lines.push(format!("{:<40} ERROR: {}", s.name, err));
                continue;
            }

            let mean = or_dash(s.rri.map(|r| r.mean), 4);
            let std = or_dash(s.rri.map(|r| r.std_dev), 4);
            let bpm = or_dash(s.mean_heart_rate_bpm, 1);

            if self.verbose {
                lines.push(format!(
                    "{:<40} {:>8.1} {:>6} {:>8} {:>8} {:>8} {:>8} {:>6} {:>8} {:>8}",
                    s.name,
                    s.analyzed_s,
                    s.beats,
                    mean,
                    std,
                    or_dash(s.rri.map(|r| r.min), 4),
                    or_dash(s.rri.map(|r| r.max), 4),
                    bpm,
                    or_dash(s.poincare.map(|p| p.sd1), 4),
                    or_dash(s.poincare.map(|p| p.sd2), 4),
                ));
            } else {
                lines.push(format!(
                    "{:<40} {:>6} {:>8} {:>8} {:>6}",
                    s.name, s.beats, mean, std, bpm
                ));
            }
        }
        lines.join("\n")
    }
}
