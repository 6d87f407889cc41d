//! In-process cache of effective configurations.
//!
//! One [`ConfigCache`] is meant to be created per process and shared by
//! reference. Entries are keyed by the resolved base file and drop-in
//! directory, so two contexts naming the same files share one value.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::{CacheKey, SystemContext};
use crate::error::Result;
use crate::loader;
use crate::registry::EffectiveConfig;

/// Cache of loaded [`EffectiveConfig`]s.
///
/// `load`, `refresh` and `invalidate` serialize on one lock. Lookups of an
/// entry that is already cached only take the map lock, so they never wait
/// on file I/O.
///
/// # Examples
///
/// ```
/// use regis_registries::{ConfigCache, EffectiveConfig, SystemContext};
///
/// let cache = ConfigCache::new();
/// let ctx = SystemContext::new().with_registries_conf_path("/nonexistent/registries.conf");
/// cache.put(&ctx, EffectiveConfig::default());
/// assert!(cache.get(&ctx).is_some());
///
/// cache.invalidate();
/// assert!(cache.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ConfigCache {
    entries: Mutex<HashMap<CacheKey, Arc<EffectiveConfig>>>,
    load_lock: Mutex<()>,
}

impl ConfigCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached configuration for `ctx`, without loading.
    #[must_use]
    pub fn get(&self, ctx: &SystemContext) -> Option<Arc<EffectiveConfig>> {
        self.entries.lock().get(&ctx.cache_key()).cloned()
    }

    /// Stores `config` as the configuration for `ctx`.
    pub fn put(&self, ctx: &SystemContext, config: EffectiveConfig) -> Arc<EffectiveConfig> {
        let config = Arc::new(config);
        self.entries.lock().insert(ctx.cache_key(), Arc::clone(&config));
        config
    }

    /// Returns the configuration for `ctx`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration has to be loaded and loading
    /// fails. Failures are not cached.
    pub fn load(&self, ctx: &SystemContext) -> Result<Arc<EffectiveConfig>> {
        let key = ctx.cache_key();
        if let Some(config) = self.entries.lock().get(&key) {
            tracing::debug!(path = %key.registries_conf.display(), "Configuration cache hit");
            return Ok(Arc::clone(config));
        }

        let _guard = self.load_lock.lock();
        // Another caller may have loaded it while we waited.
        if let Some(config) = self.entries.lock().get(&key) {
            return Ok(Arc::clone(config));
        }

        tracing::debug!(path = %key.registries_conf.display(), "Configuration cache miss");
        let config = Arc::new(loader::load(ctx)?);
        self.entries.lock().insert(key, Arc::clone(&config));
        Ok(config)
    }

    /// Reloads the configuration for `ctx` from disk.
    ///
    /// On failure the previous entry is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails.
    pub fn refresh(&self, ctx: &SystemContext) -> Result<Arc<EffectiveConfig>> {
        let key = ctx.cache_key();
        let _guard = self.load_lock.lock();
        self.entries.lock().remove(&key);

        tracing::debug!(path = %key.registries_conf.display(), "Refreshing cached configuration");
        let config = Arc::new(loader::load(ctx)?);
        self.entries.lock().insert(key, Arc::clone(&config));
        Ok(config)
    }

    /// Drops every cached configuration.
    pub fn invalidate(&self) {
        let _guard = self.load_lock.lock();
        let mut entries = self.entries.lock();
        tracing::debug!(entries = entries.len(), "Invalidating configuration cache");
        entries.clear();
    }

    /// Returns the number of cached configurations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
