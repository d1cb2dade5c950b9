//! File descriptors and the analyzable-extension policy
//!
//! The gateway mirrors file state the store asserts; it never creates or
//! deletes files itself. `analyzable` is derived on every read, not stored.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one file in the store, keyed by its path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Unique within the file store
    pub path: String,
    /// Lowercase, without dot; derived from the path when absent upstream
    pub extension: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub checksum: Option<String>,
}

impl FileDescriptor {
    pub fn new(
        path: impl Into<String>,
        size_bytes: u64,
        checksum: Option<String>,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        let path = path.into();
        let extension = extension_of(&path);
        Self {
            path,
            extension,
            size_bytes,
            uploaded_at,
            checksum,
        }
    }

    /// Basic corruption check: the store produced a size and a checksum
    pub fn passes_integrity_check(&self) -> bool {
        self.size_bytes > 0 && self.checksum.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Lowercase extension of a path, empty when there is none
pub fn extension_of(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// Fixed allow-list of extensions eligible for analysis
#[derive(Debug, Clone)]
pub struct ExtensionPolicy {
    allowed: HashSet<String>,
}

impl ExtensionPolicy {
    pub fn new(extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed: extensions
                .into_iter()
                .map(|e| e.into().to_lowercase())
                .collect(),
        }
    }

    pub fn allows(&self, extension: &str) -> bool {
        self.allowed.contains(&extension.to_lowercase())
    }

    /// A file is eligible for analysis when its extension is allowed and it
    /// passes the integrity check.
    pub fn is_analyzable(&self, descriptor: &FileDescriptor) -> bool {
        self.allows(&descriptor.extension) && descriptor.passes_integrity_check()
    }

    /// Sorted view of the allow-list, for status responses
    pub fn allowed_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.allowed.iter().cloned().collect();
        extensions.sort();
        extensions
    }
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        Self::new(["csv", "xlsx", "xls", "json", "tsv"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(path: &str, size: u64, checksum: Option<&str>) -> FileDescriptor {
        FileDescriptor::new(path, size, checksum.map(|c| c.to_string()), Utc::now())
    }

    #[test]
    fn extension_is_derived_lowercase() {
        assert_eq!(extension_of("surveys/encuesta.CSV"), "csv");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("no_extension"), "");
        assert_eq!(extension_of(".hidden"), "");
    }

    #[test]
    fn allowed_extension_with_integrity_is_analyzable() {
        let policy = ExtensionPolicy::default();
        assert!(policy.is_analyzable(&descriptor("data/a.csv", 120, Some("x"))));
        assert!(policy.is_analyzable(&descriptor("b.json", 1, Some("y"))));
    }

    #[test]
    fn zero_size_is_never_analyzable() {
        let policy = ExtensionPolicy::default();
        assert!(!policy.is_analyzable(&descriptor("a.csv", 0, Some("x"))));
    }

    #[test]
    fn missing_or_empty_checksum_fails_integrity() {
        let policy = ExtensionPolicy::default();
        assert!(!policy.is_analyzable(&descriptor("a.csv", 120, None)));
        assert!(!policy.is_analyzable(&descriptor("a.csv", 120, Some(""))));
    }

    #[test]
    fn disallowed_extension_is_not_analyzable() {
        let policy = ExtensionPolicy::default();
        assert!(!policy.is_analyzable(&descriptor("script.py", 120, Some("x"))));
        assert!(!policy.is_analyzable(&descriptor("no_extension", 120, Some("x"))));
    }
}
