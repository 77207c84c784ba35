//! Dataset format detection.
//!
//! Detection samples a bounded number of label files, classifies every
//! non-blank line with the codec and votes per line. It never fails because
//! of a single bad file: unreadable files are tallied and skipped.

mod report;

pub use report::{
    DatasetFormat, FormatVerdict, SampleCounts, REASON_MIXED, REASON_NO_LABELS_DIR,
    REASON_NO_LINES,
};

use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::error::LabelhubError;
use crate::label::{self, rel_string, LabelEncoding, PathPolicy};

/// Default number of label files read per detection.
pub const DEFAULT_SAMPLE_CAP: usize = 200;

/// How label files are picked when a dataset holds more than the cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleStrategy {
    /// The first files by relative path.
    Sorted,
    /// A uniform random subset, reproducible when a seed is given.
    Random { seed: Option<u64> },
}

/// Detection options.
#[derive(Clone, Debug)]
pub struct DetectOptions {
    pub sample_cap: usize,
    pub strategy: SampleStrategy,
    pub policy: PathPolicy,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            sample_cap: DEFAULT_SAMPLE_CAP,
            strategy: SampleStrategy::Sorted,
            policy: PathPolicy::default(),
        }
    }
}

/// Classifies the label encoding used by the dataset at `root`.
///
/// Fails only when `root` is not an existing directory. A dataset without a
/// labels tree yields an `unknown` verdict.
pub fn detect_format(root: &Path, opts: &DetectOptions) -> Result<FormatVerdict, LabelhubError> {
    if !root.is_dir() {
        return Err(LabelhubError::DatasetRootMissing {
            path: root.to_path_buf(),
        });
    }

    let Some(labels_dir) = opts.policy.labels_dir(root) else {
        return Ok(FormatVerdict::no_labels_dir());
    };

    let scan = opts.policy.scan_label_files(&labels_dir);
    let files_total_seen = scan.files.len();
    let sample = select_sample(scan.files, opts.sample_cap, opts.strategy);

    let tallies: Vec<FileTally> = sample.par_iter().map(|path| tally_file(path)).collect();

    let mut counts = SampleCounts {
        unreadable: scan.traversal_errors.len(),
        ..Default::default()
    };
    let mut first_rect = None;
    let mut first_obb = None;

    for (path, tally) in sample.iter().zip(&tallies) {
        match tally {
            FileTally::Unreadable(message) => {
                debug!(file = %path.display(), %message, "label file unreadable");
                counts.unreadable += 1;
            }
            FileTally::Empty => counts.empty += 1,
            FileTally::Lines {
                rectangle,
                obb,
                malformed,
            } => {
                counts.rectangle += rectangle;
                counts.obb += obb;
                counts.malformed += malformed;
                if *rectangle > 0 && first_rect.is_none() {
                    first_rect = Some(rel_string(&labels_dir, path));
                }
                if *obb > 0 && first_obb.is_none() {
                    first_obb = Some(rel_string(&labels_dir, path));
                }
            }
        }
    }

    let mut verdict = FormatVerdict::from_counts(counts);
    verdict.files_sampled = sample.len();
    verdict.files_total_seen = files_total_seen;
    verdict.example_file = match verdict.format {
        DatasetFormat::Rectangle => first_rect,
        DatasetFormat::Obb => first_obb,
        DatasetFormat::Unknown => None,
    };

    debug!(
        root = %root.display(),
        format = %verdict.format,
        sampled = verdict.files_sampled,
        "dataset format detected"
    );

    Ok(verdict)
}

/// Picks at most `cap` files, returned in relative-path order.
pub fn select_sample(mut files: Vec<PathBuf>, cap: usize, strategy: SampleStrategy) -> Vec<PathBuf> {
    if files.len() <= cap {
        return files;
    }

    match strategy {
        SampleStrategy::Sorted => {}
        SampleStrategy::Random { seed: Some(seed) } => {
            let mut rng = StdRng::seed_from_u64(seed);
            files.shuffle(&mut rng);
        }
        SampleStrategy::Random { seed: None } => {
            let mut rng = rand::rng();
            files.shuffle(&mut rng);
        }
    }

    files.truncate(cap);
    files.sort();
    files
}

#[derive(Debug, PartialEq)]
enum FileTally {
    Unreadable(String),
    Empty,
    Lines {
        rectangle: usize,
        obb: usize,
        malformed: usize,
    },
}

fn tally_file(path: &Path) -> FileTally {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => return FileTally::Unreadable(err.to_string()),
    };

    let mut rectangle = 0;
    let mut obb = 0;
    let mut malformed = 0;
    let mut non_blank = 0;

    for line in content.lines() {
        match label::parse_line(line) {
            Ok(None) => continue,
            Ok(Some(parsed)) => match parsed.encoding() {
                LabelEncoding::Rectangle => rectangle += 1,
                LabelEncoding::Oriented => obb += 1,
            },
            Err(_) => malformed += 1,
        }
        non_blank += 1;
    }

    if non_blank == 0 {
        FileTally::Empty
    } else {
        FileTally::Lines {
            rectangle,
            obb,
            malformed,
        }
    }
}
