//! The `images/` ↔ `labels/` directory convention.
//!
//! Datasets keep image files under an `images/` tree mirrored by a `labels/`
//! tree with matching relative paths and the extension swapped to `.txt`.
//! [`PathPolicy`] is the single place that convention is encoded; the
//! detector, converter, locator and sync trigger all go through it.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// Image extensions tried, in order, when mapping a label back to its image.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];
pub const LABEL_EXTENSION: &str = "txt";

pub const IMAGES_DIR: &str = "images";
pub const LABELS_DIR: &str = "labels";

/// Bidirectional mapping between image and label paths.
#[derive(Clone, Debug)]
pub struct PathPolicy {
    images_dir: String,
    labels_dir: String,
    image_extensions: Vec<String>,
    label_extension: String,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self {
            images_dir: IMAGES_DIR.to_string(),
            labels_dir: LABELS_DIR.to_string(),
            image_extensions: IMAGE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            label_extension: LABEL_EXTENSION.to_string(),
        }
    }
}

/// Label files found under a labels tree, plus entries that could not be visited.
#[derive(Debug, Default)]
pub struct LabelScan {
    pub labels_dir: PathBuf,
    /// Sorted by path relative to `labels_dir`.
    pub files: Vec<PathBuf>,
    pub traversal_errors: Vec<(PathBuf, String)>,
}

impl PathPolicy {
    /// Locates the labels tree belonging to `root`.
    ///
    /// `root` may be the dataset root containing `labels/`, the `labels/`
    /// directory itself, or an `images/` directory with a sibling `labels/`.
    pub fn labels_dir(&self, root: &Path) -> Option<PathBuf> {
        let nested = root.join(&self.labels_dir);
        if nested.is_dir() {
            return Some(nested);
        }

        if is_dir_named(root, &self.labels_dir) && root.is_dir() {
            return Some(root.to_path_buf());
        }

        if is_dir_named(root, &self.images_dir) {
            let sibling = root.parent()?.join(&self.labels_dir);
            if sibling.is_dir() {
                return Some(sibling);
            }
        }

        None
    }

    /// Enumerates every label file under `labels_dir`.
    pub fn scan_label_files(&self, labels_dir: &Path) -> LabelScan {
        let mut scan = LabelScan {
            labels_dir: labels_dir.to_path_buf(),
            ..Default::default()
        };

        for entry in WalkDir::new(labels_dir).follow_links(true) {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.is_label_file(entry.path()) {
                        scan.files.push(entry.path().to_path_buf());
                    }
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| labels_dir.to_path_buf());
                    scan.traversal_errors.push((path, err.to_string()));
                }
            }
        }

        scan.files
            .sort_by_cached_key(|path| rel_string(labels_dir, path));
        scan
    }

    pub fn is_label_file(&self, path: &Path) -> bool {
        has_extension(path, std::slice::from_ref(&self.label_extension))
    }

    pub fn is_image_file(&self, path: &Path) -> bool {
        has_extension(path, &self.image_extensions)
    }

    /// Candidate image paths for a label file, most likely first.
    ///
    /// The last `labels` component is swapped for `images`; a label with no
    /// such component is assumed to sit next to its image.
    pub fn image_candidates_for_label(&self, label_path: &Path) -> Vec<PathBuf> {
        let mut stems = Vec::with_capacity(2);
        if let Some(mirrored) = swap_last_component(label_path, &self.labels_dir, &self.images_dir)
        {
            stems.push(mirrored.with_extension(""));
        }
        stems.push(label_path.with_extension(""));

        stems
            .iter()
            .flat_map(|stem| {
                self.image_extensions
                    .iter()
                    .map(move |ext| append_extension(stem, ext))
            })
            .collect()
    }

    /// Finds the existing image file a label belongs to.
    pub fn image_for_label(&self, label_path: &Path) -> Option<PathBuf> {
        self.image_candidates_for_label(label_path)
            .into_iter()
            .find(|candidate| candidate.is_file())
    }

    /// The label path an image maps to. The file need not exist.
    pub fn label_for_image(&self, image_path: &Path) -> PathBuf {
        swap_last_component(image_path, &self.images_dir, &self.labels_dir)
            .unwrap_or_else(|| image_path.to_path_buf())
            .with_extension(&self.label_extension)
    }

    /// Dataset-root candidates obtained by cutting `path` before each
    /// `images` or `labels` component, deepest first.
    pub fn layout_roots(&self, path: &Path) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        let mut prefix = PathBuf::new();
        for component in path.components() {
            if let Component::Normal(name) = component {
                if self.is_layout_dir_name(name) && prefix.components().next().is_some() {
                    roots.push(prefix.clone());
                }
            }
            prefix.push(component);
        }
        roots.reverse();
        roots
    }

    fn is_layout_dir_name(&self, name: &OsStr) -> bool {
        name.to_str()
            .map(|name| {
                name.eq_ignore_ascii_case(&self.images_dir)
                    || name.eq_ignore_ascii_case(&self.labels_dir)
            })
            .unwrap_or(false)
    }
}

/// Replaces the last component equal to `from` (ignoring case) with `to`,
/// written in the same case style as the component it replaces.
fn swap_last_component(path: &Path, from: &str, to: &str) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = path.components().collect();
    let (index, found) = components
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, component)| match component {
            Component::Normal(name) => name
                .to_str()
                .filter(|n| n.eq_ignore_ascii_case(from))
                .map(|n| (i, n)),
            _ => None,
        })?;
    let replacement = match_case(found, to);

    let mut swapped = PathBuf::new();
    for (i, component) in components.iter().enumerate() {
        if i == index {
            swapped.push(&replacement);
        } else {
            swapped.push(component);
        }
    }
    Some(swapped)
}

/// `LABELS` gives `IMAGES`, `Labels` gives `Images`, anything else gives `to`.
fn match_case(like: &str, to: &str) -> String {
    let has_lower = like.chars().any(|c| c.is_ascii_lowercase());
    let starts_upper = like.chars().next().is_some_and(|c| c.is_ascii_uppercase());

    if !has_lower {
        to.to_ascii_uppercase()
    } else if starts_upper {
        let mut chars = to.chars();
        chars
            .next()
            .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
            .unwrap_or_default()
    } else {
        to.to_string()
    }
}

/// Appends `.ext` without touching dots already in the file name.
fn append_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut raw = stem.as_os_str().to_os_string();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

fn has_extension(path: &Path, allowed: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

fn is_dir_named(path: &Path, dir_name: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.eq_ignore_ascii_case(dir_name))
        .unwrap_or(false)
}

/// Path of `path` relative to `root`, with forward slashes.
pub fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn create_basic_layout(root: &Path) {
        fs::create_dir_all(root.join("images/train")).expect("create images dir");
        fs::create_dir_all(root.join("labels/train")).expect("create labels dir");
    }

    #[test]
    fn labels_dir_accepts_root_labels_or_images_dir() {
        let temp = tempfile::tempdir().expect("create temp dir");
        create_basic_layout(temp.path());
        let policy = PathPolicy::default();
        let expected = temp.path().join("labels");

        assert_eq!(policy.labels_dir(temp.path()), Some(expected.clone()));
        assert_eq!(policy.labels_dir(&expected), Some(expected.clone()));
        assert_eq!(
            policy.labels_dir(&temp.path().join("images")),
            Some(expected)
        );
    }

    #[test]
    fn labels_dir_is_none_without_labels_tree() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("images")).expect("create images dir");
        assert_eq!(PathPolicy::default().labels_dir(temp.path()), None);
    }

    #[test]
    fn scan_label_files_is_recursive_and_sorted() {
        let temp = tempfile::tempdir().expect("create temp dir");
        create_basic_layout(temp.path());
        let labels = temp.path().join("labels");
        fs::write(labels.join("train/b.txt"), "").expect("write b");
        fs::write(labels.join("a.txt"), "").expect("write a");
        fs::write(labels.join("train/notes.md"), "").expect("write md");

        let scan = PathPolicy::default().scan_label_files(&labels);
        let rels: Vec<String> = scan.files.iter().map(|p| rel_string(&labels, p)).collect();
        assert_eq!(rels, vec!["a.txt", "train/b.txt"]);
        assert!(scan.traversal_errors.is_empty());
    }

    #[test]
    fn image_for_label_prefers_extension_order() {
        let temp = tempfile::tempdir().expect("create temp dir");
        create_basic_layout(temp.path());
        fs::write(temp.path().join("images/train/sample.png"), b"dummy").expect("write png");
        fs::write(temp.path().join("images/train/sample.jpg"), b"dummy").expect("write jpg");

        let found = PathPolicy::default()
            .image_for_label(&temp.path().join("labels/train/sample.txt"))
            .expect("should find image");
        assert!(found.ends_with("images/train/sample.jpg"));
    }

    #[test]
    fn image_for_label_falls_back_to_same_directory() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("frame.bmp"), b"dummy").expect("write bmp");

        let found = PathPolicy::default()
            .image_for_label(&temp.path().join("frame.txt"))
            .expect("should find image");
        assert_eq!(found, temp.path().join("frame.bmp"));
    }

    #[test]
    fn image_candidates_keep_inner_dots() {
        let candidates =
            PathPolicy::default().image_candidates_for_label(Path::new("/d/labels/a.b.txt"));
        assert_eq!(candidates[0], PathBuf::from("/d/images/a.b.jpg"));
    }

    #[test]
    fn mapping_swaps_only_the_last_layout_component() {
        let policy = PathPolicy::default();
        let label = policy.label_for_image(Path::new("/data/labels/set/Images/train/a.jpg"));
        assert_eq!(label, PathBuf::from("/data/labels/set/Labels/train/a.txt"));

        let candidates =
            policy.image_candidates_for_label(Path::new("/data/labels/set/labels/train/a.txt"));
        assert_eq!(
            candidates[0],
            PathBuf::from("/data/labels/set/images/train/a.jpg")
        );
    }

    #[test]
    fn mirrored_image_keeps_layout_dir_case() {
        let policy = PathPolicy::default();
        assert_eq!(
            policy.image_candidates_for_label(Path::new("/d/Labels/x.txt"))[0],
            PathBuf::from("/d/Images/x.jpg")
        );
        assert_eq!(
            policy.image_candidates_for_label(Path::new("/d/LABELS/x.txt"))[0],
            PathBuf::from("/d/IMAGES/x.jpg")
        );
    }

    #[test]
    fn image_for_label_finds_capitalized_images_dir() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("Images")).expect("create images dir");
        fs::write(temp.path().join("Images/x.png"), b"dummy").expect("write png");

        let found = PathPolicy::default()
            .image_for_label(&temp.path().join("Labels/x.txt"))
            .expect("should find image");
        assert_eq!(found, temp.path().join("Images/x.png"));
    }

    #[test]
    fn layout_roots_cut_before_each_layout_dir() {
        let roots = PathPolicy::default().layout_roots(Path::new("/data/a/images/b/labels/x.txt"));
        assert_eq!(
            roots,
            vec![
                PathBuf::from("/data/a/images/b"),
                PathBuf::from("/data/a"),
            ]
        );
    }
}
