//! File readiness tracker
//!
//! Mirrors upload/removal notifications from the file store and derives
//! which files are currently eligible for analysis. State is independent of
//! module liveness: an offline store leaves the last mirrored list intact.
//! Notifications are delivered at least once; idempotent semantics absorb
//! duplicates.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::files::{ExtensionPolicy, FileDescriptor};

/// Aggregate counts over the mirrored store
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReadinessStats {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub analyzable_count: usize,
    pub by_extension: HashMap<String, usize>,
}

/// Insertion-ordered mirror of the file store's descriptors
pub struct FileReadinessTracker {
    policy: ExtensionPolicy,
    descriptors: RwLock<Vec<FileDescriptor>>,
}

impl FileReadinessTracker {
    pub fn new(policy: ExtensionPolicy) -> Self {
        Self {
            policy,
            descriptors: RwLock::new(Vec::new()),
        }
    }

    pub fn policy(&self) -> &ExtensionPolicy {
        &self.policy
    }

    /// Record an upload. A re-upload of a known path replaces its descriptor
    /// and moves it to the end of the sequence (newest upload last).
    pub fn on_uploaded(&self, descriptor: FileDescriptor) {
        let mut descriptors = self.descriptors.write();
        descriptors.retain(|d| d.path != descriptor.path);
        descriptors.push(descriptor);
    }

    /// Record a removal. Unknown paths are a no-op, not an error.
    pub fn on_removed(&self, path: &str) {
        self.descriptors.write().retain(|d| d.path != path);
    }

    /// Files currently eligible for analysis, insertion-ordered
    pub fn list_analyzable(&self) -> Vec<FileDescriptor> {
        self.descriptors
            .read()
            .iter()
            .filter(|d| self.policy.is_analyzable(d))
            .cloned()
            .collect()
    }

    /// Descriptor plus its derived analyzable flag, recomputed on request
    pub fn describe(&self, path: &str) -> Option<(FileDescriptor, bool)> {
        self.descriptors
            .read()
            .iter()
            .find(|d| d.path == path)
            .map(|d| (d.clone(), self.policy.is_analyzable(d)))
    }

    pub fn stats(&self) -> ReadinessStats {
        let descriptors = self.descriptors.read();
        let mut by_extension: HashMap<String, usize> = HashMap::new();
        let mut total_size_bytes = 0u64;
        let mut analyzable_count = 0usize;
        for descriptor in descriptors.iter() {
            if !descriptor.extension.is_empty() {
                *by_extension.entry(descriptor.extension.clone()).or_default() += 1;
            }
            total_size_bytes = total_size_bytes.saturating_add(descriptor.size_bytes);
            if self.policy.is_analyzable(descriptor) {
                analyzable_count += 1;
            }
        }
        ReadinessStats {
            total_files: descriptors.len(),
            total_size_bytes,
            analyzable_count,
            by_extension,
        }
    }
}

impl Default for FileReadinessTracker {
    fn default() -> Self {
        Self::new(ExtensionPolicy::default())
    }
}
