//! Path helpers
//!
//! Project documents always store forward-slash paths. Callers may hand us
//! absolute paths, project-relative paths or bare file names; these helpers
//! reduce them to the forms the resolver compares against.

use std::path::{Component, Path, PathBuf};

/// Normalize path to forward slashes
#[inline]
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Convert a Path to a normalized string
#[inline]
pub fn path_to_string(path: &Path) -> String {
    normalize_path(&path.to_string_lossy())
}

/// Lexically clean a path: drop `.` components and fold `..` where possible
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// Express `raw` relative to `root` when it lives under it; otherwise return
/// it cleaned and normalized unchanged.
pub fn project_relative(root: &Path, raw: &str) -> String {
    let raw_path = Path::new(raw);
    if raw_path.is_absolute() {
        let root = clean_path(root);
        let cleaned = clean_path(raw_path);
        if let Ok(rel) = cleaned.strip_prefix(&root) {
            return path_to_string(rel);
        }
        return path_to_string(&cleaned);
    }
    path_to_string(&clean_path(raw_path))
}

/// Last path component
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Split a slash-separated group path into its non-empty components
pub fn split_components(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|c| !c.is_empty() && *c != ".")
        .collect()
}

/// The three equivalent spellings a caller may use for a file:
/// project-relative path, the raw string, and the bare file name, in that order
pub fn candidate_paths(root: &Path, raw: &str) -> Vec<String> {
    let mut candidates = vec![project_relative(root, raw)];
    let normalized = normalize_path(raw);
    if !candidates.contains(&normalized) {
        candidates.push(normalized);
    }
    let name = file_name(&candidates[0]).to_string();
    if !candidates.contains(&name) {
        candidates.push(name);
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("foo\\bar\\baz"), "foo/bar/baz");
        assert_eq!(normalize_path("foo/bar/baz"), "foo/bar/baz");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn test_project_relative() {
        let root = Path::new("/work/Demo");
        assert_eq!(
            project_relative(root, "/work/Demo/Sources/App.swift"),
            "Sources/App.swift"
        );
        assert_eq!(project_relative(root, "./Sources/../Sources/App.swift"), "Sources/App.swift");
        assert_eq!(project_relative(root, "/elsewhere/Lib.swift"), "/elsewhere/Lib.swift");
    }

    #[test]
    fn test_candidate_paths_order() {
        let root = Path::new("/work/Demo");
        assert_eq!(
            candidate_paths(root, "/work/Demo/Models/User.swift"),
            vec![
                "Models/User.swift".to_string(),
                "/work/Demo/Models/User.swift".to_string(),
                "User.swift".to_string()
            ]
        );
        // Duplicate spellings collapse
        assert_eq!(candidate_paths(root, "User.swift"), vec!["User.swift".to_string()]);
    }

    #[test]
    fn test_split_components() {
        assert_eq!(split_components("/Sources//Models/"), vec!["Sources", "Models"]);
        assert!(split_components("").is_empty());
        assert_eq!(file_name("Sources/Models/"), "Models");
    }
}
