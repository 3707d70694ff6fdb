use crate::actions;
use crate::error::{FrontendError, Result};
use crate::pipeline::{ActionDef, ActionEntry};
use std::collections::{BTreeMap, BTreeSet};

/// Action name to stage table, with rule sets built once at construction.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    entries: BTreeMap<&'static str, ActionEntry>,
    disabled: BTreeSet<String>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in action.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for def in actions::all() {
            registry.register(def);
        }
        registry
    }

    pub fn register(&mut self, def: ActionDef) {
        self.entries.insert(def.name, ActionEntry::new(def));
    }

    pub fn disable(&mut self, name: &str) -> Result<()> {
        if !self.entries.contains_key(name) {
            return Err(FrontendError::UnknownAction(name.to_string()));
        }
        self.disabled.insert(name.to_string());
        Ok(())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries.contains_key(name) && !self.disabled.contains(name)
    }

    /// Look up an enabled action.
    pub fn get(&self, name: &str) -> Result<&ActionEntry> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| FrontendError::UnknownAction(name.to_string()))?;
        if self.disabled.contains(name) {
            return Err(FrontendError::ActionDisabled(name.to_string()));
        }
        Ok(entry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// All entries in name order, disabled ones included.
    pub fn entries(&self) -> impl Iterator<Item = &ActionEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
