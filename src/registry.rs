//! The in-memory list of known modules.
//!
//! Seeded once from the service listing and grown by rescans and manual
//! registrations. Modules are never removed locally; a module the server no
//! longer knows stays listed until the session is reloaded.

use crate::models::Module;

/// What an upsert did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Added,
    Replaced,
}

/// Ordered, name-unique module list.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with a listing. Duplicate names keep the first
    /// position and the last value.
    pub fn seed(&mut self, modules: Vec<Module>) {
        self.modules.clear();
        for module in modules {
            self.upsert(module);
        }
    }

    /// Append a module with a new name, or replace the one with the same
    /// name in place.
    pub fn upsert(&mut self, module: Module) -> Upsert {
        match self.modules.iter().position(|m| m.name == module.name) {
            Some(idx) => {
                self.modules[idx] = module;
                Upsert::Replaced
            }
            None => {
                self.modules.push(module);
                Upsert::Added
            }
        }
    }

    /// Merge modules returned by a scan. Returns how many were new.
    pub fn merge(&mut self, modules: Vec<Module>) -> usize {
        modules
            .into_iter()
            .map(|m| self.upsert(m))
            .filter(|u| *u == Upsert::Added)
            .count()
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(registry: &ModuleRegistry) -> Vec<&str> {
        registry.modules().iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_seed_collapses_duplicate_names() {
        let mut registry = ModuleRegistry::new();
        registry.seed(vec![
            Module::new("a", "old"),
            Module::new("b", ""),
            Module::new("a", "new"),
        ]);
        assert_eq!(names(&registry), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().path, "new");
    }

    #[test]
    fn test_merge_appends_new_and_replaces_in_place() {
        let mut registry = ModuleRegistry::new();
        registry.seed(vec![Module::new("a", "p1"), Module::new("b", "p2")]);

        let added = registry.merge(vec![Module::new("a", "p3"), Module::new("c", "p4")]);

        assert_eq!(added, 1);
        assert_eq!(names(&registry), vec!["a", "b", "c"]);
        assert_eq!(registry.get("a").unwrap().path, "p3");
    }
}
