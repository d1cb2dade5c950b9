//! Module registry: the shared store of backing services and their health
//!
//! Readers always observe a consistent per-module snapshot; updates are
//! atomic per module. Status only changes through [`ModuleRegistry::record_probe`],
//! which the health monitor drives.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::module::{Module, ModuleStatus, ProbeOutcome};

/// Registry for backing modules
pub struct ModuleRegistry {
    modules: RwLock<HashMap<String, Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: RwLock::new(HashMap::new()),
        }
    }

    /// Register a module, idempotent by name.
    ///
    /// Re-registering replaces configuration fields. The accumulated failure
    /// count and status survive only if the address is unchanged; a new
    /// address denotes a new deployment and resets health state.
    pub fn register(&self, module: Module) {
        let mut modules = self.modules.write();
        match modules.get_mut(&module.name) {
            Some(existing) if existing.base_address == module.base_address => {
                existing.health_endpoint_path = module.health_endpoint_path;
                existing.timeout_budget = module.timeout_budget;
            }
            _ => {
                modules.insert(module.name.clone(), module);
            }
        }
    }

    /// Snapshot of one module
    pub fn get(&self, name: &str) -> Option<Module> {
        self.modules.read().get(name).cloned()
    }

    /// Snapshot of all modules, ordered by name for stable output
    pub fn list(&self) -> Vec<Module> {
        let mut modules: Vec<Module> = self.modules.read().values().cloned().collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules
    }

    /// Apply a probe outcome to one module. Returns the (previous, current)
    /// status pair, or None when the module is unknown.
    pub fn record_probe(
        &self,
        name: &str,
        outcome: ProbeOutcome,
    ) -> Option<(ModuleStatus, ModuleStatus)> {
        let mut modules = self.modules.write();
        let module = modules.get_mut(name)?;
        let previous = module.status;
        module.apply_probe(outcome);
        Some((previous, module.status))
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn module(name: &str, address: &str) -> Module {
        Module::new(name, address, "/health", Duration::from_secs(10))
    }

    fn fail(registry: &ModuleRegistry, name: &str) {
        registry.record_probe(name, ProbeOutcome::Failure { latency: None });
    }

    #[test]
    fn register_and_get_roundtrip() {
        let registry = ModuleRegistry::new();
        registry.register(module("file_store", "http://10.0.0.1:8060"));
        let snapshot = registry.get("file_store").expect("registered module");
        assert_eq!(snapshot.status, ModuleStatus::Unknown);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn reregister_same_address_preserves_failures() {
        let registry = ModuleRegistry::new();
        registry.register(module("file_store", "http://10.0.0.1:8060"));
        fail(&registry, "file_store");
        fail(&registry, "file_store");

        let mut updated = module("file_store", "http://10.0.0.1:8060");
        updated.timeout_budget = Duration::from_secs(30);
        registry.register(updated);

        let snapshot = registry.get("file_store").expect("module");
        assert_eq!(snapshot.consecutive_failures, 2);
        assert_eq!(snapshot.status, ModuleStatus::Degraded);
        assert_eq!(snapshot.timeout_budget, Duration::from_secs(30));
    }

    #[test]
    fn reregister_new_address_resets_failures() {
        let registry = ModuleRegistry::new();
        registry.register(module("file_store", "http://10.0.0.1:8060"));
        fail(&registry, "file_store");
        fail(&registry, "file_store");

        registry.register(module("file_store", "http://10.0.0.2:8060"));

        let snapshot = registry.get("file_store").expect("module");
        assert_eq!(snapshot.consecutive_failures, 0);
        assert_eq!(snapshot.status, ModuleStatus::Unknown);
        assert_eq!(snapshot.base_address, "http://10.0.0.2:8060");
    }

    #[test]
    fn record_probe_reports_transition() {
        let registry = ModuleRegistry::new();
        registry.register(module("reports", "http://10.0.0.3:8070"));

        let transition = registry.record_probe(
            "reports",
            ProbeOutcome::Success {
                latency: Duration::from_millis(8),
            },
        );
        assert_eq!(
            transition,
            Some((ModuleStatus::Unknown, ModuleStatus::Online))
        );
        assert!(registry.record_probe("missing", ProbeOutcome::Failure { latency: None }).is_none());
    }

    #[test]
    fn list_is_sorted_by_name() {
        let registry = ModuleRegistry::new();
        registry.register(module("reports", "http://a"));
        registry.register(module("analysis", "http://b"));
        let names: Vec<String> = registry.list().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["analysis", "reports"]);
    }
}
