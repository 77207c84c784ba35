//! Format verdict types produced by the detector.

use serde::Serialize;
use std::fmt;

pub const REASON_NO_LINES: &str = "no parsable annotation lines found";
pub const REASON_MIXED: &str = "mixed encodings detected";
pub const REASON_NO_LABELS_DIR: &str = "labels directory not found";

/// The dominant encoding of a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFormat {
    Rectangle,
    Obb,
    Unknown,
}

impl fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatasetFormat::Rectangle => "rectangle",
            DatasetFormat::Obb => "obb",
            DatasetFormat::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Line and file tallies gathered from the sample.
///
/// `rectangle` and `obb` count lines; `empty` and `unreadable` count files.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SampleCounts {
    pub rectangle: usize,
    pub obb: usize,
    pub empty: usize,
    pub unreadable: usize,
    /// Non-blank lines that neither encoding accepts.
    pub malformed: usize,
}

/// The result of classifying a dataset's label encoding.
///
/// Built fresh on every check; nothing here is persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormatVerdict {
    pub format: DatasetFormat,
    pub reason: Option<String>,
    pub sample_counts: SampleCounts,
    /// Number of label files actually read.
    pub files_sampled: usize,
    /// Number of label files found before sampling.
    pub files_total_seen: usize,
    /// First sampled file (relative to the labels dir) carrying the winning encoding.
    pub example_file: Option<String>,
}

impl FormatVerdict {
    /// Builds a verdict from the tallies using the fixed decision rule.
    ///
    /// Both counters non-zero is reported as ambiguous; no dominant
    /// encoding is guessed.
    pub fn from_counts(counts: SampleCounts) -> Self {
        let (format, reason) = match (counts.rectangle > 0, counts.obb > 0) {
            (true, false) => (DatasetFormat::Rectangle, None),
            (false, true) => (DatasetFormat::Obb, None),
            (false, false) => (DatasetFormat::Unknown, Some(REASON_NO_LINES.to_string())),
            (true, true) => (DatasetFormat::Unknown, Some(REASON_MIXED.to_string())),
        };

        Self {
            format,
            reason,
            sample_counts: counts,
            files_sampled: 0,
            files_total_seen: 0,
            example_file: None,
        }
    }

    /// A verdict for a dataset with no labels tree at all.
    pub fn no_labels_dir() -> Self {
        Self {
            reason: Some(REASON_NO_LABELS_DIR.to_string()),
            ..Self::from_counts(SampleCounts::default())
        }
    }

    pub fn is_mixed(&self) -> bool {
        self.sample_counts.rectangle > 0 && self.sample_counts.obb > 0
    }
}

impl fmt::Display for FormatVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Format: {}", self.format)?;
        if let Some(reason) = &self.reason {
            write!(f, " ({})", reason)?;
        }
        writeln!(f)?;

        let counts = &self.sample_counts;
        writeln!(
            f,
            "  sampled {} of {} label file(s)",
            self.files_sampled, self.files_total_seen
        )?;
        writeln!(
            f,
            "  lines: {} rectangle, {} obb, {} malformed",
            counts.rectangle, counts.obb, counts.malformed
        )?;
        writeln!(
            f,
            "  files: {} empty, {} unreadable",
            counts.empty, counts.unreadable
        )?;

        if let Some(example) = &self.example_file {
            writeln!(f, "  example: {}", example)?;
        }

        Ok(())
    }
}
