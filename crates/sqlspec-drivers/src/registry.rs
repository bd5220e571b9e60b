//! Adapter registry

use std::collections::HashMap;
use std::sync::Arc;

use crate::async_dispatch::AsyncDispatch;
use crate::dispatch::SyncDispatch;

/// Registry of available database adapters, keyed by adapter name.
///
/// Sync and async adapters register independently; an adapter crate that
/// offers both registers under the same name in both tables.
pub struct AdapterRegistry {
    sync_adapters: HashMap<String, Arc<dyn SyncDispatch>>,
    async_adapters: HashMap<String, Arc<dyn AsyncDispatch>>,
}

impl AdapterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            sync_adapters: HashMap::new(),
            async_adapters: HashMap::new(),
        }
    }

    /// Register a synchronous adapter
    pub fn register(&mut self, adapter: Arc<dyn SyncDispatch>) {
        let name = adapter.name().to_string();
        tracing::info!(adapter = %name, "registering sync adapter");
        self.sync_adapters.insert(name, adapter);
    }

    /// Register an asynchronous adapter
    pub fn register_async(&mut self, adapter: Arc<dyn AsyncDispatch>) {
        let name = adapter.name().to_string();
        tracing::info!(adapter = %name, "registering async adapter");
        self.async_adapters.insert(name, adapter);
    }

    /// Get a synchronous adapter by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn SyncDispatch>> {
        let adapter = self.sync_adapters.get(name).cloned();
        if adapter.is_none() {
            tracing::warn!(adapter = %name, "sync adapter not found in registry");
        }
        adapter
    }

    /// Get an asynchronous adapter by name
    pub fn get_async(&self, name: &str) -> Option<Arc<dyn AsyncDispatch>> {
        let adapter = self.async_adapters.get(name).cloned();
        if adapter.is_none() {
            tracing::warn!(adapter = %name, "async adapter not found in registry");
        }
        adapter
    }

    /// List all registered adapter names
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .sync_adapters
            .keys()
            .chain(self.async_adapters.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Check if an adapter is registered under the name
    pub fn has(&self, name: &str) -> bool {
        self.sync_adapters.contains_key(name) || self.async_adapters.contains_key(name)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.list())
            .finish()
    }
}
