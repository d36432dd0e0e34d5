//! JSON output formatting for machine-readable output.

use super::OutputConfig;
use serde::Serialize;

/// JSON output formatter
pub struct JsonOutput;

impl JsonOutput {
    /// Format data as JSON, pretty-printed unless `config.compact` is set.
    pub fn format<T: Serialize + ?Sized>(data: &T, config: &OutputConfig) -> String {
        if config.compact {
            Self::line(data)
        } else {
            serde_json::to_string_pretty(data)
                .unwrap_or_else(|e| format!("{{\n  \"error\": \"{}\"\n}}", e))
        }
    }

    /// One JSON object on a single line, for streamed (JSONL) output.
    pub fn line<T: Serialize + ?Sized>(data: &T) -> String {
        serde_json::to_string(data).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[derive(Serialize)]
    struct Pair {
        from: String,
        to: String,
    }

    fn pair() -> Pair {
        Pair {
            from: "bafyparent".to_string(),
            to: "bafychild".to_string(),
        }
    }

    #[test]
    fn test_format_pretty() {
        let output = JsonOutput::format(&pair(), &OutputConfig::new(OutputFormat::Json));
        assert!(output.contains("\"from\": \"bafyparent\""));
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_format_compact() {
        let config = OutputConfig {
            compact: true,
            ..OutputConfig::new(OutputFormat::Json)
        };
        let output = JsonOutput::format(&pair(), &config);
        assert_eq!(output, JsonOutput::line(&pair()));
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_line() {
        assert_eq!(
            JsonOutput::line(&pair()),
            r#"{"from":"bafyparent","to":"bafychild"}"#
        );
    }
}
