//! Workflows that tie detection, conversion and sync to registered instances.
//!
//! The [`Engine`] holds configuration and the per-dataset locks. It never
//! caches registry contents: each call takes a fresh snapshot from the
//! registry passed in.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::convert::{convert_dataset, ConversionResult, ConvertOptions};
use crate::detect::{detect_format, DatasetFormat, DetectOptions, FormatVerdict, SampleStrategy};
use crate::error::LabelhubError;
use crate::instance::{Instance, InstanceRegistry};
use crate::label::PathPolicy;
use crate::lock::DatasetLocks;
use crate::sync::{CommandSyncAction, LabelSyncTrigger, SyncAction, SyncOutcome};

/// Result of [`Engine::ensure_oriented`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnsureOutcome {
    /// Detection found oriented labels only; nothing was rewritten.
    AlreadyOriented { verdict: FormatVerdict },
    /// The dataset was rectangle-encoded and has been converted.
    ///
    /// `marked` is false when the run was cancelled or some files failed,
    /// in which case the instance keeps `pentagon_format = false` and the
    /// conversion can be re-run.
    Converted {
        verdict: FormatVerdict,
        result: ConversionResult,
        marked: bool,
    },
}

impl fmt::Display for EnsureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnsureOutcome::AlreadyOriented { .. } => {
                writeln!(f, "Dataset already uses oriented labels; nothing converted.")
            }
            EnsureOutcome::Converted { result, marked, .. } => {
                writeln!(f, "Dataset converted to oriented labels.")?;
                write!(f, "{result}")?;
                if !marked {
                    writeln!(f, "  instance not marked as oriented; re-run to finish")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    policy: PathPolicy,
    locks: DatasetLocks,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn with_policy(mut self, policy: PathPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            sample_cap: self.config.sample_cap,
            strategy: SampleStrategy::Sorted,
            policy: self.policy.clone(),
        }
    }

    /// Detects the label encoding of a registered instance's dataset.
    pub fn check_format<R>(&self, registry: &R, name: &str) -> Result<FormatVerdict, LabelhubError>
    where
        R: InstanceRegistry + ?Sized,
    {
        let instance = lookup(registry, name)?;
        require_root(&instance)?;
        detect_format(&instance.dataset_path, &self.detect_options())
    }

    /// Makes sure the instance's dataset uses oriented labels.
    ///
    /// Detection and conversion run under the dataset's lock. An `unknown`
    /// verdict, including a mixed dataset, is refused with
    /// [`LabelhubError::FormatUnknown`] and nothing is written.
    pub fn ensure_oriented<R>(
        &self,
        registry: &R,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<EnsureOutcome, LabelhubError>
    where
        R: InstanceRegistry + ?Sized,
    {
        let instance = lookup(registry, name)?;
        require_root(&instance)?;
        let root = instance.dataset_path.as_path();

        self.locks.with_dataset(root, || -> Result<EnsureOutcome, LabelhubError> {
            let verdict = detect_format(root, &self.detect_options())?;

            match verdict.format {
                DatasetFormat::Obb => {
                    registry.set_pentagon_format(&instance.name, true)?;
                    info!(instance = %instance.name, "dataset already oriented");
                    Ok(EnsureOutcome::AlreadyOriented { verdict })
                }
                DatasetFormat::Unknown => Err(LabelhubError::FormatUnknown {
                    path: root.to_path_buf(),
                    reason: verdict
                        .reason
                        .clone()
                        .unwrap_or_else(|| "format could not be determined".to_string()),
                }),
                DatasetFormat::Rectangle => {
                    let opts = ConvertOptions {
                        policy: self.policy.clone(),
                        cancel: cancel.clone(),
                    };
                    let result = convert_dataset(root, &opts)?;
                    let marked = !result.cancelled && result.is_clean();
                    if marked {
                        registry.set_pentagon_format(&instance.name, true)?;
                    } else {
                        warn!(
                            instance = %instance.name,
                            failed = result.errors.len(),
                            cancelled = result.cancelled,
                            "conversion incomplete; instance left unmarked"
                        );
                    }
                    Ok(EnsureOutcome::Converted {
                        verdict,
                        result,
                        marked,
                    })
                }
            }
        })
    }

    /// A trigger running the configured sync command.
    pub fn label_sync_trigger(&self) -> LabelSyncTrigger<CommandSyncAction> {
        LabelSyncTrigger::new(CommandSyncAction::from_config(&self.config.sync))
            .with_policy(self.policy.clone())
            .with_enabled(!self.config.sync.disabled)
    }

    /// Handles a saved label against the registry's current instances.
    ///
    /// A relative `label_path` is taken against `base_hint`, or against the
    /// configured dataset base path when no hint is given.
    pub fn on_label_saved<R, A>(
        &self,
        registry: &R,
        trigger: &LabelSyncTrigger<A>,
        label_path: &Path,
        base_hint: Option<&Path>,
    ) -> Result<SyncOutcome, LabelhubError>
    where
        R: InstanceRegistry + ?Sized,
        A: SyncAction,
    {
        let instances = registry.list()?;
        let base = base_hint.unwrap_or(self.config.dataset_base_path.as_path());
        Ok(trigger.on_label_saved(label_path, Some(base), &instances))
    }
}

fn lookup<R>(registry: &R, name: &str) -> Result<Instance, LabelhubError>
where
    R: InstanceRegistry + ?Sized,
{
    registry
        .get(name)?
        .ok_or_else(|| LabelhubError::InstanceNotFound {
            name: name.to_string(),
        })
}

fn require_root(instance: &Instance) -> Result<(), LabelhubError> {
    if instance.dataset_path.is_dir() {
        Ok(())
    } else {
        Err(LabelhubError::DatasetRootMissing {
            path: instance.dataset_path.clone(),
        })
    }
}
