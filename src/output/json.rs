use super::{Formatter, RecordingSummary};

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, summaries: &[RecordingSummary]) -> String {
        serde_json::to_string_pretty(summaries)
            .unwrap_or_else(|e| format!(r#"{{"error":"{}"}}"#, e))
    }
}
