//! Sync action that launches an external program per saved label.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, info, warn};

use super::{SyncAction, SyncError};
use crate::config::{SyncConfig, DEFAULT_DATABASE_URI};
use crate::instance::Instance;

/// Runs `<program> [script] --dataset-name <name> --image-path <image>
/// --label-path <label> [--class-file <file>]`.
///
/// The child also gets `FIFTYONE_DATABASE_NAME` (the dataset name) and
/// `FIFTYONE_DATABASE_URI`. It is not waited on by the caller; a detached
/// thread reaps it and logs the exit status.
#[derive(Clone, Debug)]
pub struct CommandSyncAction {
    program: String,
    script: Option<PathBuf>,
    database_uri: String,
    verbose: bool,
}

impl CommandSyncAction {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            script: None,
            database_uri: DEFAULT_DATABASE_URI.to_string(),
            verbose: false,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            program: config.program.clone(),
            script: config.script.clone(),
            database_uri: config.database_uri.clone(),
            verbose: config.verbose,
        }
    }

    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Builds the command line without running it.
    pub fn command(&self, instance: &Instance, image_path: &Path, label_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(script) = &self.script {
            cmd.arg(script);
        }
        let name = dataset_name(instance);
        cmd.env("FIFTYONE_DATABASE_URI", &self.database_uri)
            .env("FIFTYONE_DATABASE_NAME", &name)
            .arg("--dataset-name")
            .arg(&name)
            .arg("--image-path")
            .arg(image_path)
            .arg("--label-path")
            .arg(label_path);
        if let Some(class_file) = &instance.class_file {
            cmd.arg("--class-file").arg(class_file);
        }
        cmd
    }
}

/// The downstream dataset name: the dataset directory's base name followed
/// by `_<port>` when the instance record carries a port.
pub fn dataset_name(instance: &Instance) -> String {
    let base = instance
        .dataset_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "datasets".to_string());

    match instance.extra.get("port") {
        Some(serde_json::Value::Number(port)) => format!("{base}_{port}"),
        Some(serde_json::Value::String(port)) if !port.is_empty() => format!("{base}_{port}"),
        _ => base,
    }
}

impl SyncAction for CommandSyncAction {
    fn notify(
        &self,
        instance: &Instance,
        image_path: &Path,
        label_path: &Path,
    ) -> Result<(), SyncError> {
        let verbose = self.verbose;
        let output = || {
            if verbose {
                Stdio::piped()
            } else {
                Stdio::null()
            }
        };

        let child = self
            .command(instance, image_path, label_path)
            .stdin(Stdio::null())
            .stdout(output())
            .stderr(output())
            .spawn()
            .map_err(|source| SyncError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        debug!(pid = child.id(), instance = %instance.name, "label sync started");

        let instance_name = instance.name.clone();
        let reaper = thread::Builder::new()
            .name("label-sync".to_string())
            .spawn(move || match child.wait_with_output() {
                Ok(result) if result.status.success() => {
                    if verbose && !result.stdout.is_empty() {
                        info!(
                            instance = %instance_name,
                            stdout = %String::from_utf8_lossy(&result.stdout).trim(),
                            "label sync finished"
                        );
                    }
                }
                Ok(result) => {
                    warn!(
                        instance = %instance_name,
                        status = %result.status,
                        stderr = %String::from_utf8_lossy(&result.stderr).trim(),
                        "label sync exited unsuccessfully"
                    );
                }
                Err(err) => {
                    warn!(instance = %instance_name, error = %err, "label sync could not be awaited");
                }
            });

        if let Err(err) = reaper {
            warn!(error = %err, "could not start label sync reaper thread");
        }

        Ok(())
    }
}
