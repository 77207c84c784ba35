//! Conversion result types.
//!
//! A result tracks what happened to every label file visited, so that a file
//! that was touched but needed no change can be told apart from one left
//! alone because of an error.

use serde::Serialize;
use std::fmt;

/// Summary of one dataset conversion run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ConversionResult {
    /// Files rewritten with at least one converted line.
    pub files_converted: usize,
    /// Files read successfully that already held only oriented lines.
    pub files_already_oriented: usize,
    /// Files with no lines, or nothing convertible and nothing oriented.
    pub files_skipped: usize,
    /// Rectangle lines rewritten as oriented boxes.
    pub lines_converted: usize,
    /// Malformed lines passed through untouched.
    pub lines_skipped: usize,
    /// File-level failures in relative-path order.
    pub errors: Vec<FileError>,
    /// Converted lines whose corners fall outside the unit square.
    pub anomalies: Vec<ConversionAnomaly>,
    /// True when the run stopped early on request.
    pub cancelled: bool,
}

impl ConversionResult {
    /// Number of files visited, whatever their outcome.
    pub fn files_visited(&self) -> usize {
        self.files_converted + self.files_already_oriented + self.files_skipped + self.errors.len()
    }

    /// Returns true if every visited file was handled without error.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ConversionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  files: {} converted, {} already oriented, {} skipped, {} failed",
            self.files_converted,
            self.files_already_oriented,
            self.files_skipped,
            self.errors.len()
        )?;
        writeln!(
            f,
            "  lines: {} converted, {} skipped",
            self.lines_converted, self.lines_skipped
        )?;

        if self.cancelled {
            writeln!(f, "  cancelled before all files were visited")?;
        }

        if !self.errors.is_empty() {
            writeln!(f)?;
            writeln!(f, "Errors ({}):", self.errors.len())?;
            for error in &self.errors {
                writeln!(f, "  - {}: {}", error.file, error.reason)?;
            }
        }

        if !self.anomalies.is_empty() {
            writeln!(f)?;
            writeln!(f, "Anomalies ({}):", self.anomalies.len())?;
            for anomaly in &self.anomalies {
                writeln!(
                    f,
                    "  - {}:{}: {}",
                    anomaly.file, anomaly.line, anomaly.message
                )?;
            }
        }

        Ok(())
    }
}

/// A label file that could not be read, traversed or written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileError {
    /// Path relative to the labels directory.
    pub file: String,
    pub reason: String,
}

/// A non-fatal oddity found in an otherwise converted line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConversionAnomaly {
    pub file: String,
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_is_clean() {
        let result = ConversionResult::default();
        assert!(result.is_clean());
        assert_eq!(result.files_visited(), 0);
    }

    #[test]
    fn errors_count_as_visited() {
        let result = ConversionResult {
            files_converted: 2,
            files_skipped: 1,
            errors: vec![FileError {
                file: "a.txt".to_string(),
                reason: "read failed".to_string(),
            }],
            ..Default::default()
        };
        assert!(!result.is_clean());
        assert_eq!(result.files_visited(), 4);
    }

    #[test]
    fn result_serializes_to_json() {
        let result = ConversionResult {
            files_converted: 1,
            lines_converted: 3,
            anomalies: vec![ConversionAnomaly {
                file: "train/a.txt".to_string(),
                line: 2,
                message: "corner outside [0, 1]".to_string(),
            }],
            ..Default::default()
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"files_converted\":1"));
        assert!(json.contains("\"lines_converted\":3"));
        assert!(json.contains("\"file\":\"train/a.txt\""));
        assert!(json.contains("\"cancelled\":false"));
    }

    #[test]
    fn display_lists_errors() {
        let result = ConversionResult {
            errors: vec![FileError {
                file: "bad.txt".to_string(),
                reason: "stream did not contain valid UTF-8".to_string(),
            }],
            ..Default::default()
        };
        let text = result.to_string();
        assert!(text.contains("Errors (1):"));
        assert!(text.contains("bad.txt"));
    }
}
