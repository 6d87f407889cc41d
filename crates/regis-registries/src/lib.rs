//! # Regis Registries
//!
//! Layered registry configuration for container image pulls.
//!
//! This crate loads `registries.conf` and its drop-in directory into one
//! [`EffectiveConfig`], finds the registry entry that claims a reference, and
//! expands that entry into ordered, rewritten [`PullSource`]s.
//!
//! - [`SystemContext`] - which files to read and how to resolve short names
//! - [`ConfigCache`] - per-process cache of loaded configurations
//! - [`Registry`] / [`Endpoint`] - one configured registry and its mirrors
//! - [`PrefixPattern`] - host, namespace, image and wildcard prefixes
//!
//! ## Example
//!
//! ```rust,no_run
//! use regis_core::Reference;
//! use regis_registries::{find_registry, ConfigCache, SystemContext};
//!
//! let cache = ConfigCache::new();
//! let ctx = SystemContext::new();
//!
//! let reference = Reference::parse("quay.io/podman/hello:latest")?;
//! if let Some(registry) = find_registry(&cache, &ctx, &reference.to_string())? {
//!     for source in registry.pull_sources(&reference)? {
//!         println!("{} -> {}", source.endpoint.location, source.reference);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aliases;
pub mod cache;
pub mod context;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod registry;
pub mod resolver;

mod file;
mod location;


pub use aliases::{
    parse_alias_target, parse_alias_value, validate_short_name, AliasEntry, AliasValidationError,
    AliasValue,
};
pub use cache::ConfigCache;
pub use context::{CacheKey, ShortNameMode, SystemContext, UnknownShortNameMode};
pub use error::{RegistriesError, Result};
pub use loader::{load, load_paths, merge, parse_config, PartialConfig};
pub use matcher::{find_best_registry, match_length, PrefixPattern};
pub use registry::{pull_sources, EffectiveConfig, Endpoint, PullSource, Registry};
pub use resolver::{
    credential_helpers, find_registry, get_registries, invalidate_cache, pull_sources_for,
    short_name_mode, unqualified_search_registries,
};
