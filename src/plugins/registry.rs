use std::collections::HashMap;
use std::sync::Arc;

use super::Plugin;

/// Name-keyed lookup table of capability handlers.
///
/// Built once at startup and passed into the dispatch endpoint through
/// shared state; read-only afterwards, so lookups need no synchronization.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Registers a handler under its own `name()`.
    /// A later registration with the same name replaces the earlier one.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    /// Looks up a handler by name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Registered handler names, sorted for stable log output.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
