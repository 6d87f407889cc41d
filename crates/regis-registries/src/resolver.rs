//! Registry lookups against the cached configuration of a context.
//!
//! These are the entry points for callers that hold a [`SystemContext`] and a
//! shared [`ConfigCache`] and do not want to deal with loading themselves.

use regis_core::Reference;

use crate::cache::ConfigCache;
use crate::context::{ShortNameMode, SystemContext};
use crate::error::Result;
use crate::registry::{Endpoint, PullSource, Registry};

/// Returns every configured registry, in merged order.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub fn get_registries(cache: &ConfigCache, ctx: &SystemContext) -> Result<Vec<Registry>> {
    Ok(cache.load(ctx)?.registries().to_vec())
}

/// Returns the registry that claims `reference`, if any.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub fn find_registry(
    cache: &ConfigCache,
    ctx: &SystemContext,
    reference: &str,
) -> Result<Option<Registry>> {
    let config = cache.load(ctx)?;
    let found = config.find_registry(reference).cloned();
    tracing::debug!(
        reference,
        prefix = found.as_ref().map(Registry::prefix),
        "Registry lookup"
    );
    Ok(found)
}

/// Returns where to pull `reference` from.
///
/// A reference no registry claims is pulled from its own domain.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or a rewrite
/// fails.
pub fn pull_sources_for(
    cache: &ConfigCache,
    ctx: &SystemContext,
    reference: &Reference,
) -> Result<Vec<PullSource>> {
    match find_registry(cache, ctx, &reference.to_string())? {
        Some(registry) => registry.pull_sources(reference),
        None => Ok(vec![PullSource {
            endpoint: Endpoint::new(reference.domain()),
            reference: reference.clone(),
        }]),
    }
}

/// Returns the registries searched for short names, in order.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub fn unqualified_search_registries(
    cache: &ConfigCache,
    ctx: &SystemContext,
) -> Result<Vec<Endpoint>> {
    Ok(cache.load(ctx)?.unqualified_search_registries())
}

/// Returns the short-name mode in effect: the context's override if set,
/// otherwise the configured mode.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub fn short_name_mode(cache: &ConfigCache, ctx: &SystemContext) -> Result<ShortNameMode> {
    match ctx.short_name_mode {
        Some(mode) => Ok(mode),
        None => Ok(cache.load(ctx)?.short_name_mode()),
    }
}

/// Returns the configured credential helpers.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub fn credential_helpers(cache: &ConfigCache, ctx: &SystemContext) -> Result<Vec<String>> {
    Ok(cache.load(ctx)?.credential_helpers().to_vec())
}

/// Drops every cached configuration.
pub fn invalidate_cache(cache: &ConfigCache) {
    cache.invalidate();
}
