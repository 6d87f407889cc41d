//! Prefix matching of references against registry patterns.
//!
//! A registry claims references through its `prefix`. Four kinds of prefix
//! are recognized:
//!
//! - `example.com` or `example.com:5000`: a whole registry host
//! - `example.com/ns`: a namespace below a host
//! - `example.com/ns/image:tag` or `...@sha256:...`: a single image
//! - `*.example.com`: every proper subdomain of `example.com`
//!
//! Non-wildcard prefixes match only at a component boundary: the character
//! after the prefix in the reference must be `/`, `:` or `@`, or the
//! reference must end there.

use crate::registry::Registry;

/// A registry prefix, classified once when the configuration is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrefixPattern {
    /// A registry host, optionally with a port.
    Host(String),

    /// A repository namespace below a host.
    Namespace(String),

    /// A single image, including its tag or digest.
    Image(String),

    /// A `*.`-prefixed subdomain pattern.
    Wildcard {
        /// The pattern as written, e.g. `*.example.com`.
        pattern: String,
        /// The dotted suffix a host must end with, e.g. `.example.com`.
        suffix: String,
    },

    /// A pattern using `*` in an unsupported way; never matches.
    Unmatchable(String),
}

impl PrefixPattern {
    /// Classifies a (validated) prefix string.
    ///
    /// # Examples
    ///
    /// ```
    /// use regis_registries::PrefixPattern;
    ///
    /// assert!(matches!(PrefixPattern::parse("example.com"), PrefixPattern::Host(_)));
    /// assert!(matches!(PrefixPattern::parse("example.com/ns"), PrefixPattern::Namespace(_)));
    /// assert!(matches!(PrefixPattern::parse("example.com/ns/app:v1"), PrefixPattern::Image(_)));
    /// assert!(matches!(PrefixPattern::parse("*.example.com"), PrefixPattern::Wildcard { .. }));
    /// assert!(matches!(PrefixPattern::parse("*.*.example.com"), PrefixPattern::Unmatchable(_)));
    /// ```
    #[must_use]
    pub fn parse(prefix: &str) -> Self {
        if let Some(domain) = prefix.strip_prefix("*.") {
            let supported = !domain.is_empty()
                && !domain.contains(['*', '/', ':', '@'])
                && !domain.starts_with('.');
            return if supported {
                Self::Wildcard {
                    pattern: prefix.to_string(),
                    suffix: format!(".{domain}"),
                }
            } else {
                Self::Unmatchable(prefix.to_string())
            };
        }

        if prefix.contains('*') {
            return Self::Unmatchable(prefix.to_string());
        }

        match prefix.rsplit_once('/') {
            None => Self::Host(prefix.to_string()),
            Some((_, last)) if last.contains([':', '@']) => Self::Image(prefix.to_string()),
            Some(_) => Self::Namespace(prefix.to_string()),
        }
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Host(p)
            | Self::Namespace(p)
            | Self::Image(p)
            | Self::Unmatchable(p)
            | Self::Wildcard { pattern: p, .. } => p,
        }
    }

    /// Returns true for `*.`-prefixed patterns.
    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard { .. })
    }

    /// Returns the length of the pattern if it matches `reference`.
    ///
    /// The length is that of the pattern, not of the matched text, so callers
    /// can rank matches by specificity.
    #[must_use]
    pub fn match_length(&self, reference: &str) -> Option<usize> {
        self.matched_len(reference).map(|_| self.as_str().len())
    }

    /// Returns how many leading bytes of `reference` the pattern covers.
    ///
    /// For wildcards this is the reference's host, for every other kind it is
    /// the pattern itself.
    #[must_use]
    pub fn matched_len(&self, reference: &str) -> Option<usize> {
        match self {
            Self::Host(p) | Self::Namespace(p) | Self::Image(p) => {
                let rest = reference.strip_prefix(p.as_str())?;
                at_boundary(rest).then_some(p.len())
            }
            Self::Wildcard { suffix, .. } => {
                let host_end = reference.find(['/', ':', '@']).unwrap_or(reference.len());
                let label = reference[..host_end].strip_suffix(suffix.as_str())?;
                (!label.is_empty()).then_some(host_end)
            }
            Self::Unmatchable(_) => None,
        }
    }
}

fn at_boundary(rest: &str) -> bool {
    rest.is_empty() || rest.starts_with(['/', ':', '@'])
}

/// Returns the length of `prefix` if it matches `reference`.
///
/// # Examples
///
/// ```
/// use regis_registries::match_length;
///
/// assert_eq!(match_length("example.com/ns/repo:tag", "example.com/ns"), Some(14));
/// assert_eq!(match_length("example.com/nsx/repo", "example.com/ns"), None);
/// assert_eq!(match_length("docker.io/foo", "*.io"), Some(4));
/// assert_eq!(match_length("dockerxio", "*.io"), None);
/// ```
#[must_use]
pub fn match_length(reference: &str, prefix: &str) -> Option<usize> {
    PrefixPattern::parse(prefix).match_length(reference)
}

/// Returns the registry whose prefix matches `reference` most specifically.
///
/// Ties go to the registry that appears later in `registries`, so drop-in
/// entries outrank the base file.
#[must_use]
pub fn find_best_registry<'a>(
    reference: &str,
    registries: &'a [Registry],
) -> Option<&'a Registry> {
    let mut best: Option<(usize, &Registry)> = None;
    for registry in registries {
        if let Some(length) = registry.pattern().match_length(reference) {
            if best.map_or(true, |(best_length, _)| length >= best_length) {
                best = Some((length, registry));
            }
        }
    }
    best.map(|(_, registry)| registry)
}
