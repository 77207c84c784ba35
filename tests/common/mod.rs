#![allow(dead_code)]

use std::fs;
use std::path::Path;

/// A few bytes that are not valid UTF-8, so the file cannot be read as text.
pub const NOT_UTF8: [u8; 4] = [0xff, 0xfe, 0x00, 0x80];

pub const RECT_LINE: &str = "0 0.5 0.5 0.2 0.4";
pub const OBB_LINE: &str = "1 0.1 0.1 0.3 0.1 0.3 0.3 0.1 0.3";

pub fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bytes).expect("write file");
}

/// Writes `labels/<rel>` under `root`.
pub fn write_label(root: &Path, rel: &str, content: &str) {
    write_file(&root.join("labels").join(rel), content.as_bytes());
}

/// Writes a placeholder `images/<rel>` under `root`.
pub fn write_image(root: &Path, rel: &str) {
    write_file(&root.join("images").join(rel), b"\x89PNG");
}

pub fn read_label(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join("labels").join(rel)).expect("read label")
}

/// Writes an instance registry holding `(name, dataset_path, auto_sync)` records.
pub fn write_registry(path: &Path, instances: &[(&str, &Path, bool)]) {
    let records: Vec<serde_json::Value> = instances
        .iter()
        .map(|(name, root, auto_sync)| {
            serde_json::json!({
                "name": name,
                "datasetPath": root,
                "autoSync": auto_sync,
            })
        })
        .collect();
    let json = serde_json::to_string_pretty(&records).expect("encode registry");
    write_file(path, json.as_bytes());
}
