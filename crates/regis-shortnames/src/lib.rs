//! # Regis Short Names
//!
//! Resolution of short image names such as `fedora` or `repo/image:tag`
//! into fully qualified pull candidates.
//!
//! - [`ShortNameResolver`] - resolve, record and manage aliases for a context
//! - [`AliasStore`] - the user-owned alias file
//! - [`Resolved`] / [`PullCandidate`] - the outcome of a resolution
//!
//! ## Example
//!
//! ```rust,no_run
//! use regis_registries::{ConfigCache, SystemContext};
//! use regis_shortnames::ShortNameResolver;
//!
//! let cache = ConfigCache::new();
//! let resolver = ShortNameResolver::new(&cache, SystemContext::new());
//!
//! let resolved = resolver.resolve("repo/image")?;
//! // Pull each candidate in turn; once one succeeds, remember the choice.
//! if let Some(candidate) = resolved.candidates.first() {
//!     resolver.record(candidate)?;
//! }
//! # Ok::<(), regis_shortnames::ShortNameError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alias;
pub mod error;
pub mod resolve;

pub use alias::AliasStore;
pub use error::{Result, ShortNameError};
pub use resolve::{
    add_alias, remove_alias, resolve, resolve_locally, PullCandidate, Rationale, Resolved,
    ShortNameResolver, LOCALHOST,
};
