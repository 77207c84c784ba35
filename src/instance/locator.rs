//! Resolving a filesystem path to the instance that owns it.
//!
//! Matching is longest-prefix over normalized paths. For a registered root
//! `R` and a query `Q`:
//!
//! - `Q == R` scores [`EXACT_MATCH_BONUS`] + `len(R)`;
//! - `Q` inside `R` scores `len(R)`;
//! - `R` inside `Q` scores `len(R) - 1`;
//! - anything else does not match.
//!
//! The highest score wins. Ties go to the instance registered first.
//!
//! The `R` inside `Q` rule only ever applies to the literal query. Dataset
//! roots derived from it by [`resolve_by_ancestry`] are matched exactly or
//! by containment, so the winning root always contains the query.

use std::fs;
use std::path::{Component, Path, PathBuf};

use super::Instance;
use crate::label::PathPolicy;

/// Added to exact matches so they beat every prefix match.
pub const EXACT_MATCH_BONUS: usize = 1_000_000;

/// Finds the instance owning `path`, comparing the path as given.
pub fn resolve<'a>(path: &Path, instances: &'a [Instance]) -> Option<&'a Instance> {
    let query = path_key(&normalize_path(path));
    best_match(&query, &[], instances)
}

/// Finds the instance owning `path`, which may be an image, a label or any
/// descendant of a dataset root.
///
/// Besides the literal path, every prefix ending just before an `images` or
/// `labels` component is tried as a dataset root; the best score across all
/// candidates wins. A root nested below one of those prefixes does not own
/// the path and never scores against it.
pub fn resolve_by_ancestry<'a>(
    path: &Path,
    instances: &'a [Instance],
    policy: &PathPolicy,
) -> Option<&'a Instance> {
    let normalized = normalize_path(path);
    let layout_roots: Vec<String> = policy
        .layout_roots(&normalized)
        .iter()
        .map(|root| path_key(root))
        .collect();
    best_match(&path_key(&normalized), &layout_roots, instances)
}

fn best_match<'a>(
    query: &str,
    layout_roots: &[String],
    instances: &'a [Instance],
) -> Option<&'a Instance> {
    let mut best: Option<(usize, &Instance)> = None;

    for instance in instances {
        let root = path_key(&normalize_path(&instance.dataset_path));
        let Some(score) = std::iter::once(score(query, &root))
            .chain(layout_roots.iter().map(|candidate| owner_score(candidate, &root)))
            .flatten()
            .max()
        else {
            continue;
        };

        // Strictly greater keeps the earliest instance on ties.
        if best.is_none_or(|(best_score, _)| score > best_score) {
            best = Some((score, instance));
        }
    }

    best.map(|(_, instance)| instance)
}

/// Scores how well `root` owns `query`; `None` when they are unrelated.
pub(crate) fn score(query: &str, root: &str) -> Option<usize> {
    if root.is_empty() {
        return None;
    }

    owner_score(query, root).or_else(|| {
        is_strictly_inside(root, query).then(|| root.len() - 1)
    })
}

/// Like [`score`], but only when `root` is `query` or contains it.
fn owner_score(query: &str, root: &str) -> Option<usize> {
    if root.is_empty() {
        return None;
    }

    if query == root {
        return Some(EXACT_MATCH_BONUS + root.len());
    }

    is_strictly_inside(query, root).then_some(root.len())
}

fn is_strictly_inside(inner: &str, outer: &str) -> bool {
    if outer.ends_with('/') {
        return inner.len() > outer.len() && inner.starts_with(outer);
    }
    inner
        .strip_prefix(outer)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Makes `path` absolute, lexically clean and symlink-resolved.
///
/// Symlinks are resolved on the longest existing ancestor, so paths to files
/// that do not exist (yet) still normalize deterministically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let cleaned = lexical_clean(&absolute);

    let mut existing = cleaned.as_path();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return match cleaned.strip_prefix(existing) {
                Ok(rest) if !rest.as_os_str().is_empty() => canonical.join(rest),
                _ => canonical,
            };
        }
        match existing.parent() {
            Some(parent) => existing = parent,
            None => return cleaned,
        }
    }
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// The string form used for comparisons: forward slashes, no trailing slash.
fn path_key(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() && raw.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instances(roots: &[&str]) -> Vec<Instance> {
        roots
            .iter()
            .enumerate()
            .map(|(i, root)| Instance::new(format!("inst{i}"), *root))
            .collect()
    }

    #[test]
    fn score_orders_exact_inside_and_contains() {
        assert_eq!(score("/data/a", "/data/a"), Some(EXACT_MATCH_BONUS + 7));
        assert_eq!(score("/data/a/x.jpg", "/data/a"), Some(7));
        assert_eq!(score("/data", "/data/a"), Some(6));
        assert_eq!(score("/data/ab", "/data/a"), None);
        assert_eq!(score("/data/a", ""), None);
    }

    #[test]
    fn score_handles_filesystem_root() {
        assert_eq!(score("/data", "/"), Some(1));
        assert_eq!(score("/", "/"), Some(EXACT_MATCH_BONUS + 1));
    }

    #[test]
    fn deepest_root_wins() {
        let instances = instances(&["/data/a", "/data/a/b"]);
        let policy = PathPolicy::default();

        let found = resolve_by_ancestry(Path::new("/data/a/b/images/x.jpg"), &instances, &policy)
            .expect("should resolve");
        assert_eq!(found.name, "inst1");

        let found = resolve(Path::new("/data/a/b/images/x.jpg"), &instances).expect("resolve");
        assert_eq!(found.name, "inst1");
    }

    #[test]
    fn exact_root_beats_nested_root() {
        let instances = instances(&["/data/a/b", "/data/a"]);
        let found = resolve(Path::new("/data/a"), &instances).expect("should resolve");
        assert_eq!(found.name, "inst1");
    }

    #[test]
    fn ties_go_to_first_registered() {
        let instances = instances(&["/data/a", "/data/a/", "/data/./a"]);
        let found = resolve(Path::new("/data/a/labels/x.txt"), &instances).expect("resolve");
        assert_eq!(found.name, "inst0");
    }

    #[test]
    fn unrelated_paths_do_not_resolve() {
        let instances = instances(&["/data/a", "/data/b"]);
        assert!(resolve(Path::new("/other/a/x.txt"), &instances).is_none());
        assert!(resolve(Path::new("/data/abc"), &instances).is_none());
        assert!(resolve(Path::new("/data/a"), &[]).is_none());
    }

    #[test]
    fn ancestry_strips_layout_dirs_for_images_rooted_instances() {
        // An instance registered on the dataset root is found from a path
        // that only shares the root before `labels/`.
        let instances = instances(&["/data/set/images", "/data/set"]);
        let policy = PathPolicy::default();

        let found = resolve_by_ancestry(Path::new("/data/set/labels/a.txt"), &instances, &policy)
            .expect("should resolve");
        assert_eq!(found.name, "inst1");
    }

    #[test]
    fn ancestry_never_picks_a_root_below_the_stripped_path() {
        let instances = vec![
            Instance::new("outer", "/data/a"),
            Instance::new("sibling", "/data/a/b/other"),
        ];
        let policy = PathPolicy::default();

        let found = resolve_by_ancestry(Path::new("/data/a/b/images/x.jpg"), &instances, &policy)
            .expect("should resolve");
        assert_eq!(found.name, "outer");
    }

    #[test]
    fn ancestry_still_matches_a_root_inside_the_literal_path() {
        let instances = instances(&["/data/a/b"]);
        let found = resolve_by_ancestry(Path::new("/data/a"), &instances, &PathPolicy::default())
            .expect("should resolve");
        assert_eq!(found.name, "inst0");
    }

    #[test]
    fn normalize_resolves_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("/definitely-missing-root/a/../b/./c")),
            PathBuf::from("/definitely-missing-root/b/c")
        );
    }

    #[test]
    fn normalize_follows_existing_ancestor_symlinks() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let real = temp.path().join("real");
        fs::create_dir_all(&real).expect("create real dir");

        #[cfg(unix)]
        {
            let link = temp.path().join("link");
            std::os::unix::fs::symlink(&real, &link).expect("create symlink");
            assert_eq!(
                normalize_path(&link.join("labels/missing.txt")),
                fs::canonicalize(&real).unwrap().join("labels/missing.txt")
            );
        }
    }
}
