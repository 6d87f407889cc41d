//! Registry records and pull-source assembly.

use std::collections::BTreeMap;
use std::iter;

use regis_core::Reference;

use crate::aliases::AliasEntry;
use crate::context::ShortNameMode;
use crate::error::{RegistriesError, Result};
use crate::matcher::{find_best_registry, PrefixPattern};

/// Credential helper used when no configuration file names one.
pub const DEFAULT_CREDENTIAL_HELPER: &str = "containers-auth.json";

/// A network location to pull from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// `host[:port][/path]`, without scheme or trailing slash.
    pub location: String,

    /// Skip TLS verification and allow plain HTTP.
    pub insecure: bool,
}

impl Endpoint {
    /// Creates a secure endpoint.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            insecure: false,
        }
    }

    /// Marks the endpoint insecure.
    #[must_use]
    pub const fn insecure(mut self) -> Self {
        self.insecure = true;
        self
    }
}

/// A concrete place to pull an image from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullSource {
    /// Endpoint to contact.
    pub endpoint: Endpoint,

    /// Reference to request from that endpoint.
    pub reference: Reference,
}

/// One registry entry of an effective configuration.
///
/// # Examples
///
/// ```
/// use regis_core::Reference;
/// use regis_registries::{Endpoint, Registry};
///
/// let registry = Registry::new("registry.example.com")
///     .with_prefix("example.com/foo")
///     .with_mirror(Endpoint::new("mirror.local/foo"));
///
/// let reference = Reference::parse("example.com/foo/app:v1")?;
/// let sources = registry.pull_sources(&reference)?;
/// assert_eq!(sources[0].reference.to_string(), "mirror.local/foo/app:v1");
/// assert_eq!(sources[1].reference.to_string(), "registry.example.com/app:v1");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    endpoint: Endpoint,
    mirrors: Vec<Endpoint>,
    blocked: bool,
    searchable: bool,
    mirror_by_digest_only: bool,
    pattern: PrefixPattern,
}

impl Registry {
    /// Creates a registry whose prefix is its own location.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        let endpoint = Endpoint::new(location);
        let pattern = PrefixPattern::parse(&endpoint.location);
        Self {
            endpoint,
            mirrors: Vec::new(),
            blocked: false,
            searchable: false,
            mirror_by_digest_only: false,
            pattern,
        }
    }

    /// Sets the prefix pattern.
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.pattern = PrefixPattern::parse(prefix);
        self
    }

    /// Appends a mirror.
    #[must_use]
    pub fn with_mirror(mut self, mirror: Endpoint) -> Self {
        self.mirrors.push(mirror);
        self
    }

    /// Sets whether the primary endpoint is insecure.
    #[must_use]
    pub const fn with_insecure(mut self, insecure: bool) -> Self {
        self.endpoint.insecure = insecure;
        self
    }

    /// Sets whether pulls from this registry are blocked.
    #[must_use]
    pub const fn with_blocked(mut self, blocked: bool) -> Self {
        self.blocked = blocked;
        self
    }

    /// Sets whether the registry is searched for short names.
    #[must_use]
    pub const fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    /// Sets whether mirrors are only used for digest pulls.
    #[must_use]
    pub const fn with_mirror_by_digest_only(mut self, digest_only: bool) -> Self {
        self.mirror_by_digest_only = digest_only;
        self
    }

    /// Returns the primary endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the primary endpoint's location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.endpoint.location
    }

    /// Returns the mirrors in configuration order.
    #[must_use]
    pub fn mirrors(&self) -> &[Endpoint] {
        &self.mirrors
    }

    /// Returns true if pulls from this registry must be refused.
    #[must_use]
    pub const fn blocked(&self) -> bool {
        self.blocked
    }

    /// Returns true if the primary endpoint is insecure.
    #[must_use]
    pub const fn insecure(&self) -> bool {
        self.endpoint.insecure
    }

    /// Returns true if the registry is searched for short names.
    #[must_use]
    pub const fn searchable(&self) -> bool {
        self.searchable
    }

    /// Returns true if mirrors only serve digest pulls.
    #[must_use]
    pub const fn mirror_by_digest_only(&self) -> bool {
        self.mirror_by_digest_only
    }

    /// Returns the prefix as written.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns the classified prefix.
    #[must_use]
    pub const fn pattern(&self) -> &PrefixPattern {
        &self.pattern
    }

    /// Returns the ordered endpoints to try for `reference`.
    ///
    /// Mirrors come first, then the primary endpoint. With
    /// `mirror-by-digest-only`, tag pulls skip the mirrors because mirrors are
    /// not guaranteed to serve the same content for a tag.
    #[must_use]
    pub fn endpoints_for(&self, reference: &Reference) -> Vec<&Endpoint> {
        if self.mirror_by_digest_only && reference.digest().is_none() {
            return vec![&self.endpoint];
        }
        self.mirrors.iter().chain(iter::once(&self.endpoint)).collect()
    }

    /// Rewrites `reference` from this registry's prefix onto `location`.
    ///
    /// Everything after the matched prefix (namespace remainder, tag,
    /// digest) is kept verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`RegistriesError::PrefixMismatch`] if the reference does not
    /// match the prefix, or [`RegistriesError::Rewrite`] if the rewritten
    /// string is not a valid qualified reference.
    pub fn rewrite_reference(&self, reference: &Reference, location: &str) -> Result<Reference> {
        let original = reference.to_string();
        let matched = self.pattern.matched_len(&original).ok_or_else(|| {
            RegistriesError::PrefixMismatch {
                reference: original.clone(),
                prefix: self.prefix().to_string(),
            }
        })?;

        let candidate = format!("{location}{}", &original[matched..]);
        Reference::parse_qualified(&candidate)
            .map_err(|source| RegistriesError::Rewrite { candidate, source })
    }

    /// Returns the ordered pull sources for `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if any rewrite fails; see
    /// [`Registry::rewrite_reference`].
    pub fn pull_sources(&self, reference: &Reference) -> Result<Vec<PullSource>> {
        self.endpoints_for(reference)
            .into_iter()
            .map(|endpoint| {
                Ok(PullSource {
                    endpoint: endpoint.clone(),
                    reference: self.rewrite_reference(reference, &endpoint.location)?,
                })
            })
            .collect()
    }
}

/// The merged, validated result of a base file plus its drop-ins.
///
/// Immutable once built; a reload produces a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub(crate) registries: Vec<Registry>,
    pub(crate) unqualified_search_registries: Vec<String>,
    pub(crate) short_name_mode: ShortNameMode,
    pub(crate) credential_helpers: Vec<String>,
    pub(crate) aliases: BTreeMap<String, AliasEntry>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            registries: Vec::new(),
            unqualified_search_registries: Vec::new(),
            short_name_mode: ShortNameMode::default(),
            credential_helpers: vec![DEFAULT_CREDENTIAL_HELPER.to_string()],
            aliases: BTreeMap::new(),
        }
    }
}

impl EffectiveConfig {
    /// Returns the registries in merged order.
    #[must_use]
    pub fn registries(&self) -> &[Registry] {
        &self.registries
    }

    /// Returns the registry that claims `reference`, if any.
    #[must_use]
    pub fn find_registry(&self, reference: &str) -> Option<&Registry> {
        find_best_registry(reference, &self.registries)
    }

    /// Returns the locations searched for short names, in order.
    #[must_use]
    pub fn unqualified_search_registry_locations(&self) -> &[String] {
        &self.unqualified_search_registries
    }

    /// Returns the endpoints searched for short names, in order.
    ///
    /// A location that is also a registry's primary location takes that
    /// registry's endpoint (and so its `insecure` flag).
    #[must_use]
    pub fn unqualified_search_registries(&self) -> Vec<Endpoint> {
        self.unqualified_search_registries
            .iter()
            .map(|location| {
                self.registries
                    .iter()
                    .find(|registry| registry.location() == location)
                    .map_or_else(|| Endpoint::new(location.clone()), |r| r.endpoint.clone())
            })
            .collect()
    }

    /// Returns the configured short-name mode.
    #[must_use]
    pub const fn short_name_mode(&self) -> ShortNameMode {
        self.short_name_mode
    }

    /// Returns the credential helpers in order.
    #[must_use]
    pub fn credential_helpers(&self) -> &[String] {
        &self.credential_helpers
    }

    /// Returns all configuration-declared aliases, tombstones included.
    #[must_use]
    pub const fn aliases(&self) -> &BTreeMap<String, AliasEntry> {
        &self.aliases
    }

    /// Returns the configuration-declared alias for `name`.
    #[must_use]
    pub fn alias(&self, name: &str) -> Option<&AliasEntry> {
        self.aliases.get(name)
    }
}

/// Returns the ordered pull sources for `reference` from `registry`.
///
/// # Errors
///
/// Returns an error if a rewritten reference does not re-parse.
pub fn pull_sources(registry: &Registry, reference: &Reference) -> Result<Vec<PullSource>> {
    registry.pull_sources(reference)
}
