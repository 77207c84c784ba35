//! In-place conversion of a dataset from rectangle to oriented labels.
//!
//! Every label file under the labels tree is visited (no sampling). Each
//! rectangle line is rewritten as the four corners of the same axis-aligned
//! box; oriented lines and malformed lines are kept byte-for-byte. Running
//! the conversion again changes nothing, so an interrupted run can simply be
//! restarted.
//!
//! The converter does not run detection itself. Callers are expected to have
//! confirmed a rectangle dataset first (see [`crate::engine`]).

mod report;

pub use report::{ConversionAnomaly, ConversionResult, FileError};

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::LabelhubError;
use crate::fsutil::write_text_atomically;
use crate::label::{self, rel_string, PathPolicy, Shape, UNIT_EPSILON};

/// Conversion options.
#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    pub policy: PathPolicy,
    pub cancel: CancelToken,
}

/// Converts every label file of the dataset at `root` to the oriented encoding.
///
/// Fails only when `root` or its labels tree is missing. Per-file failures
/// are collected in [`ConversionResult::errors`] and never stop the run.
pub fn convert_dataset(
    root: &Path,
    opts: &ConvertOptions,
) -> Result<ConversionResult, LabelhubError> {
    if !root.is_dir() {
        return Err(LabelhubError::DatasetRootMissing {
            path: root.to_path_buf(),
        });
    }

    let labels_dir = opts
        .policy
        .labels_dir(root)
        .ok_or_else(|| LabelhubError::LabelsDirMissing {
            path: root.to_path_buf(),
        })?;

    let scan = opts.policy.scan_label_files(&labels_dir);
    info!(
        root = %root.display(),
        files = scan.files.len(),
        "converting dataset to oriented labels"
    );

    let outcomes: Vec<Option<FileOutcome>> = scan
        .files
        .par_iter()
        .map(|path| {
            if opts.cancel.is_cancelled() {
                None
            } else {
                Some(convert_file(path))
            }
        })
        .collect();

    let mut result = ConversionResult::default();
    for (path, reason) in &scan.traversal_errors {
        result.errors.push(FileError {
            file: rel_string(&labels_dir, path),
            reason: format!("failed while traversing directory: {reason}"),
        });
    }

    for (path, outcome) in scan.files.iter().zip(outcomes) {
        let Some(outcome) = outcome else {
            result.cancelled = true;
            continue;
        };
        let rel = rel_string(&labels_dir, path);

        match outcome {
            FileOutcome::Converted {
                lines_converted,
                lines_skipped,
                out_of_range,
            } => {
                result.files_converted += 1;
                result.lines_converted += lines_converted;
                result.lines_skipped += lines_skipped;
                result
                    .anomalies
                    .extend(out_of_range.into_iter().map(|line| ConversionAnomaly {
                        file: rel.clone(),
                        line,
                        message: "converted corner lies outside [0, 1]; left unclamped"
                            .to_string(),
                    }));
            }
            FileOutcome::AlreadyOriented { lines_skipped } => {
                result.files_already_oriented += 1;
                result.lines_skipped += lines_skipped;
            }
            FileOutcome::Skipped { lines_skipped } => {
                result.files_skipped += 1;
                result.lines_skipped += lines_skipped;
            }
            FileOutcome::Failed(reason) => {
                warn!(file = %path.display(), %reason, "label file not converted");
                result.errors.push(FileError { file: rel, reason });
            }
        }
    }

    info!(
        root = %root.display(),
        converted = result.files_converted,
        already_oriented = result.files_already_oriented,
        skipped = result.files_skipped,
        failed = result.errors.len(),
        cancelled = result.cancelled,
        "dataset conversion finished"
    );

    Ok(result)
}

#[derive(Debug, PartialEq)]
enum FileOutcome {
    Converted {
        lines_converted: usize,
        lines_skipped: usize,
        /// 1-based numbers of lines with out-of-range corners.
        out_of_range: Vec<usize>,
    },
    AlreadyOriented {
        lines_skipped: usize,
    },
    Skipped {
        lines_skipped: usize,
    },
    Failed(String),
}

fn convert_file(path: &Path) -> FileOutcome {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => return FileOutcome::Failed(format!("read failed: {err}")),
    };

    let converted = convert_content(&content);
    if converted.lines_converted == 0 {
        return if converted.lines_oriented > 0 {
            FileOutcome::AlreadyOriented {
                lines_skipped: converted.lines_skipped,
            }
        } else {
            FileOutcome::Skipped {
                lines_skipped: converted.lines_skipped,
            }
        };
    }

    if let Err(err) = write_text_atomically(path, &converted.text) {
        return FileOutcome::Failed(format!("write failed: {err}"));
    }

    FileOutcome::Converted {
        lines_converted: converted.lines_converted,
        lines_skipped: converted.lines_skipped,
        out_of_range: converted.out_of_range,
    }
}

#[derive(Debug, Default)]
struct ConvertedContent {
    text: String,
    lines_converted: usize,
    lines_oriented: usize,
    lines_skipped: usize,
    out_of_range: Vec<usize>,
}

/// Rewrites rectangle lines of one file's content; all other lines are kept verbatim.
fn convert_content(content: &str) -> ConvertedContent {
    let mut out = ConvertedContent {
        text: String::with_capacity(content.len() * 2),
        ..Default::default()
    };

    for (line_idx, line) in content.lines().enumerate() {
        match label::parse_line(line) {
            Ok(Some(parsed)) => match parsed.shape {
                Shape::Rect(rect) => {
                    let (corners, out_of_range) =
                        rect.to_oriented().clamp_to_unit(UNIT_EPSILON);
                    if out_of_range {
                        out.out_of_range.push(line_idx + 1);
                    }
                    let oriented = label::ParsedAnnotation::oriented(parsed.class_id, corners);
                    out.text.push_str(&label::format_line(&oriented));
                    out.lines_converted += 1;
                }
                Shape::Oriented(_) => {
                    out.text.push_str(line);
                    out.lines_oriented += 1;
                }
            },
            Ok(None) => out.text.push_str(line),
            Err(err) => {
                debug!(line = line_idx + 1, %err, "keeping malformed label line");
                out.text.push_str(line);
                out.lines_skipped += 1;
            }
        }
        out.text.push('\n');
    }

    out
}
