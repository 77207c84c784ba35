//! Annotation-review instances and the registry that owns them.
//!
//! The engine treats instances as read-mostly input. The only write it ever
//! asks for is [`InstanceRegistry::set_pentagon_format`] after a dataset has
//! been confirmed or converted to the oriented encoding.

pub mod locator;
mod registry;

pub use locator::{normalize_path, resolve, resolve_by_ancestry, EXACT_MATCH_BONUS};
pub use registry::{JsonFileRegistry, MemoryRegistry};

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::LabelhubError;

/// How the external viewer renders oriented boxes.
///
/// Has no effect on conversion arithmetic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObbMode {
    #[default]
    #[serde(rename = "rectangle")]
    Rectangle,
    #[serde(rename = "4point")]
    FourPoint,
}

impl fmt::Display for ObbMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObbMode::Rectangle => f.write_str("rectangle"),
            ObbMode::FourPoint => f.write_str("4point"),
        }
    }
}

/// One annotation-review instance bound to a dataset directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub name: String,
    pub dataset_path: PathBuf,
    #[serde(default)]
    pub pentagon_format: bool,
    #[serde(default)]
    pub obb_mode: ObbMode,
    #[serde(default)]
    pub auto_sync: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_file: Option<PathBuf>,
    /// Fields owned by other tools, kept so that rewrites do not drop them.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Instance {
    pub fn new(name: impl Into<String>, dataset_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dataset_path: dataset_path.into(),
            pentagon_format: false,
            obb_mode: ObbMode::default(),
            auto_sync: false,
            class_file: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_auto_sync(mut self, auto_sync: bool) -> Self {
        self.auto_sync = auto_sync;
        self
    }
}

/// Source of instance records.
///
/// Implementations hand out snapshots; the engine never holds on to a live
/// view of the registry.
pub trait InstanceRegistry {
    /// All instances in registration order.
    fn list(&self) -> Result<Vec<Instance>, LabelhubError>;

    /// Looks up one instance by name.
    fn get(&self, name: &str) -> Result<Option<Instance>, LabelhubError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|instance| instance.name == name))
    }

    /// Records whether the instance's dataset uses the oriented encoding.
    fn set_pentagon_format(&self, name: &str, value: bool) -> Result<(), LabelhubError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_reads_camel_case_and_defaults() {
        let json = r#"{"name":"cars","datasetPath":"/data/cars"}"#;
        let instance: Instance = serde_json::from_str(json).unwrap();

        assert_eq!(instance.name, "cars");
        assert_eq!(instance.dataset_path, PathBuf::from("/data/cars"));
        assert!(!instance.pentagon_format);
        assert!(!instance.auto_sync);
        assert_eq!(instance.obb_mode, ObbMode::Rectangle);
        assert_eq!(instance.class_file, None);
    }

    #[test]
    fn instance_keeps_unknown_fields() {
        let json = r#"{"name":"cars","datasetPath":"/d","obbMode":"4point","autoSync":true,"port":5151}"#;
        let instance: Instance = serde_json::from_str(json).unwrap();
        assert_eq!(instance.obb_mode, ObbMode::FourPoint);
        assert!(instance.auto_sync);

        let back = serde_json::to_string(&instance).unwrap();
        assert!(back.contains("\"port\":5151"));
        assert!(back.contains("\"obbMode\":\"4point\""));
        assert!(back.contains("\"datasetPath\":\"/d\""));
    }
}
