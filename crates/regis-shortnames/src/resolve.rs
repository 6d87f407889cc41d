//! Short-name resolution.
//!
//! [`ShortNameResolver::resolve`] turns user input into ordered pull
//! candidates:
//!
//! 1. Qualified input (it names a registry) is returned as is.
//! 2. A short name with an alias resolves to that alias only.
//! 3. Any other short name expands over the unqualified-search registries,
//!    subject to the short-name mode.

use std::fmt;
use std::path::PathBuf;

use regis_core::{NameComponents, Reference};
use regis_registries::{
    parse_alias_target, short_name_mode, validate_short_name, ConfigCache, EffectiveConfig,
    RegistriesError, ShortNameMode, SystemContext,
};

use crate::alias::AliasStore;
use crate::error::{Result, ShortNameError};

/// Local-storage domain tried first by [`ShortNameResolver::resolve_locally`].
pub const LOCALHOST: &str = "localhost";

/// Why a resolution produced the candidates it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rationale {
    /// The input already named a registry.
    Qualified,

    /// An alias matched.
    Alias {
        /// File that declared the alias.
        origin: PathBuf,
    },

    /// The unqualified-search registries were expanded.
    Search,
}

/// One place to try pulling from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullCandidate {
    /// Fully qualified reference to pull.
    pub value: Reference,

    /// Whether a successful pull may be recorded as a user alias.
    pub recordable: bool,

    short_name: String,
}

impl PullCandidate {
    /// Returns the short name this candidate was derived from.
    #[must_use]
    pub fn short_name(&self) -> &str {
        &self.short_name
    }
}

/// The outcome of [`ShortNameResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Input as given.
    pub input: String,

    /// How the candidates were found.
    pub rationale: Rationale,

    /// Candidates in the order they should be tried.
    pub candidates: Vec<PullCandidate>,
}

impl Resolved {
    /// Returns a one-line, human-readable account of the resolution.
    #[must_use]
    pub fn description(&self) -> String {
        match &self.rationale {
            Rationale::Qualified => format!("\"{}\" is a fully qualified reference", self.input),
            Rationale::Alias { origin } => {
                format!("Resolved \"{}\" as an alias ({})", self.input, origin.display())
            }
            Rationale::Search => format!(
                "Resolving \"{}\" using unqualified-search registries",
                self.input
            ),
        }
    }
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Resolves short names against one context.
///
/// # Examples
///
/// ```no_run
/// use regis_registries::{ConfigCache, SystemContext};
/// use regis_shortnames::ShortNameResolver;
///
/// let cache = ConfigCache::new();
/// let resolver = ShortNameResolver::new(&cache, SystemContext::new());
///
/// let resolved = resolver.resolve("fedora:41")?;
/// println!("{}", resolved.description());
/// for candidate in &resolved.candidates {
///     println!("  {}", candidate.value);
/// }
/// # Ok::<(), regis_shortnames::ShortNameError>(())
/// ```
#[derive(Debug)]
pub struct ShortNameResolver<'a> {
    cache: &'a ConfigCache,
    ctx: SystemContext,
    aliases: AliasStore,
}

impl<'a> ShortNameResolver<'a> {
    /// Creates a resolver using `cache` for configuration and the user alias
    /// file named by `ctx`.
    #[must_use]
    pub fn new(cache: &'a ConfigCache, ctx: SystemContext) -> Self {
        let aliases = AliasStore::for_context(&ctx);
        Self {
            cache,
            ctx,
            aliases,
        }
    }

    /// Returns the context.
    #[must_use]
    pub const fn context(&self) -> &SystemContext {
        &self.ctx
    }

    /// Returns the user alias store.
    #[must_use]
    pub const fn alias_store(&self) -> &AliasStore {
        &self.aliases
    }

    /// Resolves `input` into ordered pull candidates.
    ///
    /// Every candidate without a tag or digest is tagged `latest`.
    ///
    /// # Errors
    ///
    /// - [`ShortNameError::InvalidInput`] for empty, malformed or
    ///   scheme-prefixed input
    /// - [`ShortNameError::NoSearchRegistries`] if a short name has no alias
    ///   and there is nowhere to search
    /// - [`ShortNameError::AmbiguousShortName`] in enforcing mode with more
    ///   than one search registry
    /// - configuration and alias file errors
    pub fn resolve(&self, input: &str) -> Result<Resolved> {
        let components = parse_input(input)?;

        if !components.is_short_name() {
            let value = Reference::from_components(components.clone()).with_default_tag();
            tracing::debug!(input, candidate = %value, "Input is fully qualified");
            return Ok(Resolved {
                input: input.to_string(),
                rationale: Rationale::Qualified,
                candidates: vec![PullCandidate {
                    value,
                    recordable: false,
                    short_name: components.name,
                }],
            });
        }

        let config = self.cache.load(&self.ctx)?;
        if let Some((target, origin)) = self.aliases.lookup(&config, &components.name)? {
            let value = with_suffix(&target.to_string(), &components)?;
            tracing::debug!(
                input,
                candidate = %value,
                origin = %origin.display(),
                "Short name resolved through alias"
            );
            return Ok(Resolved {
                input: input.to_string(),
                rationale: Rationale::Alias { origin },
                candidates: vec![PullCandidate {
                    value,
                    recordable: false,
                    short_name: components.name,
                }],
            });
        }

        let mode = short_name_mode(self.cache, &self.ctx)?;
        let registries = config.unqualified_search_registry_locations();
        match (mode, registries.len()) {
            (_, 0) => {
                return Err(ShortNameError::NoSearchRegistries {
                    name: components.name,
                })
            }
            (ShortNameMode::Enforcing, n) if n > 1 => {
                return Err(ShortNameError::AmbiguousShortName {
                    name: components.name,
                    registries: registries.to_vec(),
                })
            }
            _ => {}
        }

        let candidates = search_candidates(&config, &components)?
            .into_iter()
            .map(|value| PullCandidate {
                value,
                recordable: true,
                short_name: components.name.clone(),
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            input,
            %mode,
            candidates = candidates.len(),
            "Short name expanded over unqualified-search registries"
        );
        Ok(Resolved {
            input: input.to_string(),
            rationale: Rationale::Search,
            candidates,
        })
    }

    /// Lists every reference `input` may already be stored under locally.
    ///
    /// For a short name: the alias target (if any), then `localhost/<name>`,
    /// then one entry per search registry. The short-name mode is not
    /// enforced since nothing is pulled.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid input or if configuration or the alias
    /// file cannot be read.
    pub fn resolve_locally(&self, input: &str) -> Result<Vec<Reference>> {
        let components = parse_input(input)?;
        if !components.is_short_name() {
            return Ok(vec![Reference::from_components(components).with_default_tag()]);
        }

        let config = self.cache.load(&self.ctx)?;
        let mut references = Vec::new();
        if let Some((target, _)) = self.aliases.lookup(&config, &components.name)? {
            references.push(with_suffix(&target.to_string(), &components)?);
        }
        references.push(with_suffix(
            &format!("{LOCALHOST}/{}", components.name),
            &components,
        )?);
        references.extend(search_candidates(&config, &components)?);
        Ok(references)
    }

    /// Stores a recordable candidate as a user alias.
    ///
    /// Non-recordable candidates are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the alias file cannot be written.
    pub fn record(&self, candidate: &PullCandidate) -> Result<()> {
        if !candidate.recordable {
            tracing::debug!(
                candidate = %candidate.value,
                "Candidate is not recordable, skipping"
            );
            return Ok(());
        }
        self.aliases
            .add(&candidate.short_name, &candidate.value.trimmed())
    }

    /// Adds or replaces the user alias `name -> value`.
    ///
    /// # Errors
    ///
    /// Returns [`ShortNameError::InvalidAlias`] if `name` is not an untagged
    /// short name or `value` is not an untagged qualified reference, or an
    /// error if the alias file cannot be written.
    pub fn add_alias(&self, name: &str, value: &str) -> Result<()> {
        validate_short_name(name)?;
        let target = parse_alias_target(value)?;
        self.aliases.add(name, &target)
    }

    /// Removes the user alias `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ShortNameError::NotUserOwned`] for aliases declared by the
    /// configuration, [`ShortNameError::AliasNotFound`] if there is no such
    /// alias, or an error if a file cannot be read or written.
    pub fn remove_alias(&self, name: &str) -> Result<()> {
        validate_short_name(name)?;
        let config = self.cache.load(&self.ctx)?;
        self.aliases.remove(&config, name)
    }
}

fn parse_input(input: &str) -> Result<NameComponents> {
    let invalid = |reason: String| ShortNameError::InvalidInput {
        input: input.to_string(),
        reason,
    };
    if input.is_empty() {
        return Err(invalid("empty name".to_string()));
    }
    if input.contains("://") {
        return Err(invalid(
            "transport prefixes are not supported for short-name resolution".to_string(),
        ));
    }
    NameComponents::parse(input).map_err(|e| invalid(e.to_string()))
}

/// Appends the input's tag and digest to `name` and tags it `latest` if it
/// has neither.
fn with_suffix(name: &str, components: &NameComponents) -> Result<Reference> {
    let candidate = format!("{name}{}", components.suffix());
    Reference::parse_qualified(&candidate)
        .map(|reference| reference.with_default_tag())
        .map_err(|source| RegistriesError::Rewrite { candidate, source }.into())
}

fn search_candidates(
    config: &EffectiveConfig,
    components: &NameComponents,
) -> Result<Vec<Reference>> {
    config
        .unqualified_search_registry_locations()
        .iter()
        .map(|registry| with_suffix(&format!("{registry}/{}", components.name), components))
        .collect()
}

/// Resolves `input` with a one-off resolver; see
/// [`ShortNameResolver::resolve`].
///
/// # Errors
///
/// See [`ShortNameResolver::resolve`].
pub fn resolve(cache: &ConfigCache, ctx: &SystemContext, input: &str) -> Result<Resolved> {
    ShortNameResolver::new(cache, ctx.clone()).resolve(input)
}

/// Lists local storage candidates with a one-off resolver; see
/// [`ShortNameResolver::resolve_locally`].
///
/// # Errors
///
/// See [`ShortNameResolver::resolve_locally`].
pub fn resolve_locally(
    cache: &ConfigCache,
    ctx: &SystemContext,
    input: &str,
) -> Result<Vec<Reference>> {
    ShortNameResolver::new(cache, ctx.clone()).resolve_locally(input)
}

/// Adds a user alias; see [`ShortNameResolver::add_alias`].
///
/// # Errors
///
/// See [`ShortNameResolver::add_alias`].
pub fn add_alias(cache: &ConfigCache, ctx: &SystemContext, name: &str, value: &str) -> Result<()> {
    ShortNameResolver::new(cache, ctx.clone()).add_alias(name, value)
}

/// Removes a user alias; see [`ShortNameResolver::remove_alias`].
///
/// # Errors
///
/// See [`ShortNameResolver::remove_alias`].
pub fn remove_alias(cache: &ConfigCache, ctx: &SystemContext, name: &str) -> Result<()> {
    ShortNameResolver::new(cache, ctx.clone()).remove_alias(name)
}
