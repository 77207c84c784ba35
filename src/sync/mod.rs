//! Propagating label edits to the downstream reviewer.
//!
//! After a label file is saved, [`LabelSyncTrigger::on_label_saved`] finds the
//! owning instance, maps the label back to its image and, when the instance
//! has auto-sync enabled, invokes the [`SyncAction`] once. None of this can
//! fail the save itself: every path ends in a [`SyncOutcome`].

mod command;

pub use command::CommandSyncAction;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::instance::{resolve_by_ancestry, Instance};
use crate::label::PathPolicy;

/// Why a sync action could not be carried out.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to launch sync program '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sync action failed: {0}")]
    Failed(String),
}

/// The downstream side effect run for a saved label.
///
/// Implementations must return promptly; long-running work belongs in the
/// background.
pub trait SyncAction: Send + Sync {
    fn notify(
        &self,
        instance: &Instance,
        image_path: &Path,
        label_path: &Path,
    ) -> Result<(), SyncError>;
}

/// Why a save did not trigger a sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// No registered instance owns the label.
    Unmatched,
    /// The owning instance (or the whole engine) has sync turned off.
    SyncDisabled,
    /// No image file corresponds to the label.
    ImageNotFound,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::Unmatched => "unmatched",
            SkipReason::SyncDisabled => "sync-disabled",
            SkipReason::ImageNotFound => "image-not-found",
        };
        f.write_str(reason)
    }
}

/// What happened after a label save. Every variant means the save succeeded.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    NoOp {
        reason: SkipReason,
        instance: Option<String>,
    },
    Triggered {
        instance: String,
        image_path: PathBuf,
    },
    /// The action was invoked and reported a failure; logged as a warning.
    Failed {
        instance: String,
        image_path: PathBuf,
        message: String,
    },
}

impl SyncOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, SyncOutcome::NoOp { .. })
    }

    fn noop(reason: SkipReason, instance: Option<&Instance>) -> Self {
        SyncOutcome::NoOp {
            reason,
            instance: instance.map(|instance| instance.name.clone()),
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::NoOp { reason, instance } => match instance {
                Some(name) => write!(f, "no-op ({reason}) for instance {name}"),
                None => write!(f, "no-op ({reason})"),
            },
            SyncOutcome::Triggered {
                instance,
                image_path,
            } => write!(
                f,
                "sync triggered for instance {instance} ({})",
                image_path.display()
            ),
            SyncOutcome::Failed {
                instance, message, ..
            } => write!(f, "sync failed for instance {instance}: {message}"),
        }
    }
}

/// Decides whether and how a label save propagates downstream.
pub struct LabelSyncTrigger<A> {
    action: A,
    policy: PathPolicy,
    enabled: bool,
}

impl<A: SyncAction> LabelSyncTrigger<A> {
    pub fn new(action: A) -> Self {
        Self {
            action,
            policy: PathPolicy::default(),
            enabled: true,
        }
    }

    pub fn with_policy(mut self, policy: PathPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Turns syncing off for every instance, regardless of its own setting.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    /// Handles one saved label.
    ///
    /// `base_hint` is the directory a relative `label_path` was given
    /// against; it is tried first, then `label_path` on its own.
    pub fn on_label_saved(
        &self,
        label_path: &Path,
        base_hint: Option<&Path>,
        instances: &[Instance],
    ) -> SyncOutcome {
        let hinted = base_hint.map(|base| base.join(label_path));
        let candidates = hinted
            .iter()
            .map(PathBuf::as_path)
            .chain(std::iter::once(label_path));

        let mut owner = None;
        for candidate in candidates {
            if let Some(instance) = resolve_by_ancestry(candidate, instances, &self.policy) {
                owner = Some((instance, candidate));
                break;
            }
        }

        let Some((instance, full_label_path)) = owner else {
            debug!(label = %label_path.display(), "saved label has no owning instance");
            return SyncOutcome::noop(SkipReason::Unmatched, None);
        };

        if !instance.auto_sync || !self.enabled {
            return SyncOutcome::noop(SkipReason::SyncDisabled, Some(instance));
        }

        let Some(image_path) = self.policy.image_for_label(full_label_path) else {
            warn!(
                label = %full_label_path.display(),
                instance = %instance.name,
                "label sync skipped: image path not found"
            );
            return SyncOutcome::noop(SkipReason::ImageNotFound, Some(instance));
        };

        match self.action.notify(instance, &image_path, full_label_path) {
            Ok(()) => SyncOutcome::Triggered {
                instance: instance.name.clone(),
                image_path,
            },
            Err(err) => {
                warn!(
                    label = %full_label_path.display(),
                    instance = %instance.name,
                    error = %err,
                    "label sync failed"
                );
                SyncOutcome::Failed {
                    instance: instance.name.clone(),
                    image_path,
                    message: err.to_string(),
                }
            }
        }
    }
}
