//! Multi-tier statement caches
//!
//! Five LRU namespaces keyed on stable content fingerprints: parsed
//! expressions, optimized expressions, compiled statements, builder
//! outputs, and loaded SQL files. Each namespace has independent capacity
//! and single-flight semantics: concurrent misses on one key share a
//! single computation.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use lru::LruCache;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;

use crate::ast::Expression;
use crate::error::Result;
use crate::statement::CompiledSql;

/// Per-namespace capacities.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub expression_capacity: usize,
    pub optimized_capacity: usize,
    pub compiled_capacity: usize,
    pub builder_capacity: usize,
    pub file_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expression_capacity: 1024,
            optimized_capacity: 512,
            compiled_capacity: 2048,
            builder_capacity: 512,
            file_capacity: 256,
        }
    }
}

/// Hit/miss counters for one namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// A SQL file parsed into named statements, pinned to a content checksum.
///
/// A checksum mismatch on lookup invalidates the entry and forces a
/// re-read.
#[derive(Debug, Clone)]
pub struct CachedSqlFile {
    pub path: PathBuf,
    pub checksum: String,
    pub statements: IndexMap<String, String>,
}

/// One bounded LRU namespace with single-flight computation.
pub struct CacheNamespace<V: Clone> {
    name: &'static str,
    store: Mutex<LruCache<u64, V>>,
    inflight: Mutex<HashMap<u64, Arc<OnceCell<V>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> CacheNamespace<V> {
    fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            name,
            store: Mutex::new(LruCache::new(capacity)),
            inflight: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a key, refreshing its recency on hit.
    pub fn get(&self, key: u64) -> Option<V> {
        let value = self.store.lock().get(&key).cloned();
        match &value {
            Some(_) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(namespace = self.name, key, "cache hit");
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }
        value
    }

    /// Insert a value, evicting the least-recently-used entry on overflow.
    pub fn insert(&self, key: u64, value: V) {
        self.store.lock().put(key, value);
    }

    /// Remove an entry.
    pub fn remove(&self, key: u64) {
        self.store.lock().pop(&key);
    }

    /// Get the cached value or compute it exactly once.
    ///
    /// Concurrent callers for the same missing key observe one
    /// computation; the rest block on the in-flight cell and receive the
    /// same result. A failed computation leaves nothing behind, so the
    /// next caller recomputes.
    pub fn get_or_compute(&self, key: u64, compute: impl FnOnce() -> Result<V>) -> Result<V> {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let cell = {
            let mut inflight = self.inflight.lock();
            inflight
                .entry(key)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        let result = cell.get_or_try_init(compute).cloned();
        // Publish before dropping the in-flight cell so a late arrival
        // either joins the cell or hits the store, never recomputes.
        if let Ok(value) = &result {
            self.insert(key, value.clone());
        }
        self.inflight.lock().remove(&key);
        result
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<V: Clone> std::fmt::Debug for CacheNamespace<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheNamespace")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

/// All cache namespaces, one instance per engine (process-wide by
/// default).
#[derive(Debug)]
pub struct CacheRegistry {
    expression: CacheNamespace<Arc<Expression>>,
    optimized: CacheNamespace<Arc<Expression>>,
    compiled: CacheNamespace<CompiledSql>,
    builder: CacheNamespace<CompiledSql>,
    file: CacheNamespace<Arc<CachedSqlFile>>,
}

impl CacheRegistry {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            expression: CacheNamespace::new("expression", config.expression_capacity),
            optimized: CacheNamespace::new("optimized", config.optimized_capacity),
            compiled: CacheNamespace::new("compiled", config.compiled_capacity),
            builder: CacheNamespace::new("builder", config.builder_capacity),
            file: CacheNamespace::new("file", config.file_capacity),
        }
    }

    /// Parsed expressions keyed on (text, dialect).
    pub fn expression(&self) -> &CacheNamespace<Arc<Expression>> {
        &self.expression
    }

    /// Optimized expressions keyed on (expression, dialect, rewrites).
    pub fn optimized(&self) -> &CacheNamespace<Arc<Expression>> {
        &self.optimized
    }

    /// Compiled statements keyed on (text, config, target style, filters).
    pub fn compiled(&self) -> &CacheNamespace<CompiledSql> {
        &self.compiled
    }

    /// Builder outputs keyed on builder state bytes.
    pub fn builder(&self) -> &CacheNamespace<CompiledSql> {
        &self.builder
    }

    /// Loaded SQL files keyed on path, validated by checksum.
    pub fn file(&self) -> &CacheNamespace<Arc<CachedSqlFile>> {
        &self.file
    }

    pub fn clear(&self) {
        self.expression.clear();
        self.optimized.clear();
        self.compiled.clear();
        self.builder.clear();
        self.file.clear();
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

static GLOBAL_CACHES: Lazy<Arc<CacheRegistry>> = Lazy::new(|| Arc::new(CacheRegistry::default()));

/// The process-wide cache registry.
pub fn global_caches() -> Arc<CacheRegistry> {
    GLOBAL_CACHES.clone()
}
