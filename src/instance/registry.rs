//! Registry implementations.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use super::{Instance, InstanceRegistry};
use crate::error::LabelhubError;
use crate::fsutil::write_text_atomically;

/// A registry stored as a JSON array of instance records.
///
/// A missing file reads as an empty registry.
#[derive(Clone, Debug)]
pub struct JsonFileRegistry {
    path: PathBuf,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn save(&self, instances: &[Instance]) -> Result<(), LabelhubError> {
        let json = serde_json::to_string_pretty(instances).map_err(|source| {
            LabelhubError::RegistryWrite {
                path: self.path.clone(),
                message: source.to_string(),
            }
        })?;

        write_text_atomically(&self.path, &json).map_err(|source| LabelhubError::RegistryWrite {
            path: self.path.clone(),
            message: source.to_string(),
        })
    }
}

impl InstanceRegistry for JsonFileRegistry {
    fn list(&self) -> Result<Vec<Instance>, LabelhubError> {
        if !self.path.is_file() {
            debug!(path = %self.path.display(), "instance registry missing; treating as empty");
            return Ok(Vec::new());
        }

        let data = fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|source| LabelhubError::RegistryParse {
            path: self.path.clone(),
            source,
        })
    }

    fn set_pentagon_format(&self, name: &str, value: bool) -> Result<(), LabelhubError> {
        let mut instances = self.list()?;
        let instance = instances
            .iter_mut()
            .find(|instance| instance.name == name)
            .ok_or_else(|| LabelhubError::InstanceNotFound {
                name: name.to_string(),
            })?;

        if instance.pentagon_format == value {
            return Ok(());
        }
        instance.pentagon_format = value;
        self.save(&instances)
    }
}

/// An in-process registry, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    instances: Mutex<Vec<Instance>>,
}

impl MemoryRegistry {
    pub fn new(instances: Vec<Instance>) -> Self {
        Self {
            instances: Mutex::new(instances),
        }
    }
}

impl InstanceRegistry for MemoryRegistry {
    fn list(&self) -> Result<Vec<Instance>, LabelhubError> {
        let guard = self
            .instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(guard.clone())
    }

    fn set_pentagon_format(&self, name: &str, value: bool) -> Result<(), LabelhubError> {
        let mut guard = self
            .instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let instance = guard
            .iter_mut()
            .find(|instance| instance.name == name)
            .ok_or_else(|| LabelhubError::InstanceNotFound {
                name: name.to_string(),
            })?;
        instance.pentagon_format = value;
        Ok(())
    }
}
