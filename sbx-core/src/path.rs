//! Storage path normalization

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonicalize a path string: leading `/`, no trailing `/` except for the root.
///
/// Empty input maps to the root. Runs of separators collapse, `.` segments are
/// dropped and `..` removes the previous segment, stopping at the root.
pub fn normalize(path: &str) -> String {
    StoragePath::new(path).to_path_string()
}

/// Absolute path relative to a storage root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoragePath {
    /// Path segments
    pub segments: Vec<String>,
}

impl StoragePath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self::root().join(path)
    }

    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    /// Append `name`, which may itself contain separators.
    ///
    /// `..` never climbs above this path.
    pub fn join(&self, name: impl AsRef<str>) -> Self {
        let base = self.segments.len();
        let mut segments = self.segments.clone();
        for segment in name.as_ref().split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.len() > base {
                        segments.pop();
                    }
                }
                _ => segments.push(segment.to_string()),
            }
        }
        Self { segments }
    }

    /// Place `path` underneath this path, treating `path` as relative to it.
    pub fn resolve(&self, path: &StoragePath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(path.segments.iter().cloned());
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut segments = self.segments.clone();
            segments.pop();
            Some(Self { segments })
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn to_path_string(&self) -> String {
        if self.segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.segments.join("/"))
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path_string())
    }
}

impl From<&str> for StoragePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_leading_slash() {
        assert_eq!(normalize("chunks/ab"), "/chunks/ab");
        assert_eq!(normalize("/chunks/ab"), "/chunks/ab");
    }

    #[test]
    fn test_normalize_strips_trailing_slash() {
        assert_eq!(normalize("/snapshots/"), "/snapshots");
        assert_eq!(normalize("snapshots/host/"), "/snapshots/host");
    }

    #[test]
    fn test_normalize_root_forms() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("///"), "/");
    }

    #[test]
    fn test_normalize_collapses_separators() {
        assert_eq!(normalize("//chunks//ab//"), "/chunks/ab");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["", "/", "a", "a/", "/a/b/", "//a//b", "config", "chunks/ab/cd/ef.fsl"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input {:?}", input);
            assert!(once.starts_with('/'));
            assert!(once == "/" || !once.ends_with('/'));
        }
    }

    #[test]
    fn test_dot_segments_are_resolved() {
        assert_eq!(normalize("chunks/./ab"), "/chunks/ab");
        assert_eq!(normalize("chunks/ab/../cd"), "/chunks/cd");
        assert_eq!(normalize("../x"), "/x");
        assert_eq!(normalize("/../../"), "/");
        assert_eq!(normalize(&normalize("a/../../b/.")), "/b");
    }

    #[test]
    fn test_resolve_never_escapes_root() {
        let root = StoragePath::new("/backups/repo");
        let resolved = root.resolve(&StoragePath::new("../../etc/passwd"));
        assert_eq!(resolved.to_string(), "/backups/repo/etc/passwd");
        assert!(resolved.segments.starts_with(&root.segments));

        let joined = root.join("../other");
        assert_eq!(joined.to_string(), "/backups/repo/other");
    }

    #[test]
    fn test_join() {
        let path = StoragePath::new("/chunks").join("ab").join("cd/ef");
        assert_eq!(path.to_path_string(), "/chunks/ab/cd/ef");
    }

    #[test]
    fn test_resolve_under_root() {
        let root = StoragePath::new("/backups/repo");
        assert_eq!(root.resolve(&StoragePath::new("chunks/ab")).to_string(), "/backups/repo/chunks/ab");
        assert_eq!(root.resolve(&StoragePath::root()).to_string(), "/backups/repo");
        assert_eq!(StoragePath::root().resolve(&StoragePath::new("config")).to_string(), "/config");
    }

    #[test]
    fn test_parent_and_name() {
        let path = StoragePath::new("/chunks/ab/12cd");
        assert_eq!(path.name(), Some("12cd"));
        assert_eq!(path.parent().unwrap().to_string(), "/chunks/ab");
        assert!(StoragePath::root().parent().is_none());
        assert!(StoragePath::root().name().is_none());
    }

    #[test]
    fn test_equality() {
        assert_eq!(StoragePath::new("/chunks/ab"), StoragePath::from("chunks/ab/"));
    }
}
