//! Engine configuration.
//!
//! Everything has a default; environment variables override them. Reading
//! goes through a lookup function so that tests never have to touch the
//! process environment.

use std::path::PathBuf;

use crate::detect::DEFAULT_SAMPLE_CAP;
use crate::error::LabelhubError;

pub const DEFAULT_DATASET_BASE_PATH: &str = "/data/datasets";
pub const DEFAULT_SYNC_PROGRAM: &str = "python3";
pub const DEFAULT_SYNC_SCRIPT: &str = "sync_label.py";
pub const DEFAULT_REGISTRY_FILE: &str = "instances.json";
pub const DEFAULT_DATABASE_URI: &str = "mongodb://mongodb:27017";

/// Settings for the downstream label sync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    pub program: String,
    /// Passed as the first argument when set.
    pub script: Option<PathBuf>,
    /// Handed to the sync program as `FIFTYONE_DATABASE_URI`.
    pub database_uri: String,
    /// Capture the child's output and log it.
    pub verbose: bool,
    /// Turns the sync off for every instance.
    pub disabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_SYNC_PROGRAM.to_string(),
            script: Some(PathBuf::from(DEFAULT_SYNC_SCRIPT)),
            database_uri: DEFAULT_DATABASE_URI.to_string(),
            verbose: false,
            disabled: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory relative label paths are resolved against when the caller
    /// gives no base of its own.
    pub dataset_base_path: PathBuf,
    /// Label files read per format detection.
    pub sample_cap: usize,
    pub registry_path: PathBuf,
    pub sync: SyncConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dataset_base_path: PathBuf::from(DEFAULT_DATASET_BASE_PATH),
            sample_cap: DEFAULT_SAMPLE_CAP,
            registry_path: PathBuf::from(DEFAULT_REGISTRY_FILE),
            sync: SyncConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, LabelhubError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LabelhubError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let sample_cap = match get("LABELHUB_SAMPLE_CAP") {
            Some(raw) => parse_sample_cap(&raw)?,
            None => defaults.sample_cap,
        };

        let program = get("LABEL_SYNC_PROGRAM")
            .or_else(|| get("PYTHON_BIN"))
            .unwrap_or(defaults.sync.program);

        let script = match get("LABEL_SYNC_SCRIPT") {
            Some(raw) => Some(PathBuf::from(raw)),
            None => defaults.sync.script,
        };

        Ok(Self {
            dataset_base_path: get("DATASET_BASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_base_path),
            sample_cap,
            registry_path: get("LABELHUB_INSTANCES")
                .map(PathBuf::from)
                .unwrap_or(defaults.registry_path),
            sync: SyncConfig {
                program,
                script,
                database_uri: get("FIFTYONE_DATABASE_URI").unwrap_or(defaults.sync.database_uri),
                verbose: get("LABEL_SYNC_VERBOSE").is_some_and(|v| parse_flag(&v)),
                disabled: get("LABEL_SYNC_DISABLED").is_some_and(|v| parse_flag(&v)),
            },
        })
    }
}

/// `1`, `true` and `yes` in any case are on; anything else is off.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn parse_sample_cap(raw: &str) -> Result<usize, LabelhubError> {
    let invalid = |message: String| LabelhubError::InvalidConfig {
        key: "LABELHUB_SAMPLE_CAP".to_string(),
        message,
    };

    let cap: usize = raw
        .trim()
        .parse()
        .map_err(|err| invalid(format!("'{raw}' is not a number: {err}")))?;
    if cap == 0 {
        return Err(invalid("must be greater than zero".to_string()));
    }
    Ok(cap)
}
