//! Container image references.
//!
//! Two views of the same grammar are provided:
//!
//! - [`NameComponents`] keeps the input as written (`repo/image:tag` stays
//!   `repo/image`), which is what short-name handling needs.
//! - [`Reference`] is normalized: it always carries a registry domain, so
//!   `busybox` becomes `docker.io/library/busybox`.
//!
//! Grammar:
//!
//! ```text
//! reference := name [ ":" tag ] [ "@" digest ]
//! name      := [ domain "/" ] path-component { "/" path-component }
//! domain    := host [ ":" port ] | "[" ipv6 "]" [ ":" port ]
//! ```

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ParseError, Result};

/// Registry domain used for references without an explicit domain.
pub const DEFAULT_DOMAIN: &str = "docker.io";

/// Tag applied by [`Reference::with_default_tag`].
pub const DEFAULT_TAG: &str = "latest";

/// Maximum length of the name part of a reference.
pub const NAME_TOTAL_LENGTH_MAX: usize = 255;

const LEGACY_DEFAULT_DOMAIN: &str = "index.docker.io";
const OFFICIAL_REPO_PREFIX: &str = "library/";

const DOMAIN_COMPONENT: &str = r"(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
const IPV6_ADDRESS: &str = r"\[[a-fA-F0-9:]+\]";
const PATH_COMPONENT: &str = r"[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*";
const TAG: &str = r"[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}";
const DIGEST: &str = r"[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}";

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    let domain =
        format!(r"(?:{IPV6_ADDRESS}|{DOMAIN_COMPONENT}(?:\.{DOMAIN_COMPONENT})*)(?::[0-9]+)?");
    let name = format!(r"(?:{domain}/)?{PATH_COMPONENT}(?:/{PATH_COMPONENT})*");
    Regex::new(&format!(r"^({name})(?::({TAG}))?(?:@({DIGEST}))?$"))
        .expect("reference grammar is a valid regex")
});

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{TAG}$")).expect("tag grammar is a valid regex"));

static DIGEST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{DIGEST}$")).expect("digest grammar is a valid regex"));

/// A reference split into its parts, exactly as the user wrote it.
///
/// No domain is inferred and no `library/` namespace is added.
///
/// # Examples
///
/// ```
/// use regis_core::NameComponents;
///
/// let parts = NameComponents::parse("repo/fedora:38").unwrap();
/// assert_eq!(parts.name, "repo/fedora");
/// assert_eq!(parts.tag.as_deref(), Some("38"));
/// assert!(parts.is_short_name());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameComponents {
    /// Repository name, including the domain when one was written.
    pub name: String,

    /// Tag, if present.
    pub tag: Option<String>,

    /// Digest (`algorithm:hex`), if present.
    pub digest: Option<String>,
}

impl NameComponents {
    /// Parses `input` against the reference grammar without normalizing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, does not follow the grammar,
    /// or its name part is longer than [`NAME_TOTAL_LENGTH_MAX`].
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let captures = REFERENCE_RE
            .captures(input)
            .ok_or_else(|| ParseError::InvalidFormat {
                input: input.to_string(),
            })?;

        let name = captures.get(1).map_or("", |m| m.as_str());
        if name.len() > NAME_TOTAL_LENGTH_MAX {
            return Err(ParseError::NameTooLong {
                input: input.to_string(),
                max: NAME_TOTAL_LENGTH_MAX,
            });
        }

        Ok(Self {
            name: name.to_string(),
            tag: captures.get(2).map(|m| m.as_str().to_string()),
            digest: captures.get(3).map(|m| m.as_str().to_string()),
        })
    }

    /// Returns the registry domain written in the name, if any.
    ///
    /// The first path component is a domain when it contains `.` or `:`,
    /// is `localhost`, or contains uppercase letters (which repository
    /// paths cannot).
    #[must_use]
    pub fn explicit_domain(&self) -> Option<&str> {
        let (first, _) = self.name.split_once('/')?;
        let is_domain = first.contains(['.', ':'])
            || first == "localhost"
            || first.chars().any(|c| c.is_ascii_uppercase());
        is_domain.then_some(first)
    }

    /// Returns true if the name lacks an explicit registry domain.
    #[must_use]
    pub fn is_short_name(&self) -> bool {
        self.explicit_domain().is_none()
    }

    /// Returns true if neither a tag nor a digest is present.
    #[must_use]
    pub const fn is_name_only(&self) -> bool {
        self.tag.is_none() && self.digest.is_none()
    }

    /// Returns the `:tag` / `@digest` suffix as written.
    #[must_use]
    pub fn suffix(&self) -> String {
        let mut suffix = String::new();
        if let Some(tag) = &self.tag {
            suffix.push(':');
            suffix.push_str(tag);
        }
        if let Some(digest) = &self.digest {
            suffix.push('@');
            suffix.push_str(digest);
        }
        suffix
    }
}

/// A normalized, fully qualified image reference.
///
/// `Reference` values are immutable; the `with_*` methods return new values.
///
/// # Examples
///
/// ```
/// use regis_core::Reference;
///
/// let reference = Reference::parse("busybox:1.36").unwrap();
/// assert_eq!(reference.domain(), "docker.io");
/// assert_eq!(reference.path(), "library/busybox");
/// assert_eq!(reference.to_string(), "docker.io/library/busybox:1.36");
///
/// let reference = Reference::parse("quay.io/repo/image").unwrap();
/// assert_eq!(reference.with_default_tag().to_string(), "quay.io/repo/image:latest");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    domain: String,
    path: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl Reference {
    /// Parses and normalizes a reference.
    ///
    /// References without an explicit domain are placed on
    /// [`DEFAULT_DOMAIN`]; single-component Docker Hub names get the
    /// `library/` namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid reference.
    pub fn parse(input: &str) -> Result<Self> {
        Ok(Self::from_components(NameComponents::parse(input)?))
    }

    /// Parses a reference that must name its registry explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::NotQualified`] if the input has no explicit
    /// domain, or any error [`Reference::parse`] would return.
    pub fn parse_qualified(input: &str) -> Result<Self> {
        let components = NameComponents::parse(input)?;
        if components.is_short_name() {
            return Err(ParseError::NotQualified {
                input: input.to_string(),
            });
        }
        Ok(Self::from_components(components))
    }

    /// Builds a normalized reference from already-parsed components.
    #[must_use]
    pub fn from_components(components: NameComponents) -> Self {
        let (domain, path) = match components.explicit_domain() {
            Some(domain) => (
                domain.to_string(),
                components.name[domain.len() + 1..].to_string(),
            ),
            None => (DEFAULT_DOMAIN.to_string(), components.name.clone()),
        };

        let domain = if domain == LEGACY_DEFAULT_DOMAIN {
            DEFAULT_DOMAIN.to_string()
        } else {
            domain
        };

        let path = if domain == DEFAULT_DOMAIN && !path.contains('/') {
            format!("{OFFICIAL_REPO_PREFIX}{path}")
        } else {
            path
        };

        Self {
            domain,
            path,
            tag: components.tag,
            digest: components.digest,
        }
    }

    /// Returns the registry domain, including the port if any.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the repository path below the domain.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Returns the digest, if any.
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Returns `domain/path` without tag or digest.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}/{}", self.domain, self.path)
    }

    /// Returns true if neither a tag nor a digest is present.
    #[must_use]
    pub const fn is_name_only(&self) -> bool {
        self.tag.is_none() && self.digest.is_none()
    }

    /// Returns a copy with tag and digest removed.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            domain: self.domain.clone(),
            path: self.path.clone(),
            tag: None,
            digest: None,
        }
    }

    /// Returns a copy carrying `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidTag`] if the tag is malformed.
    pub fn with_tag(&self, tag: &str) -> Result<Self> {
        if !TAG_RE.is_match(tag) {
            return Err(ParseError::InvalidTag {
                tag: tag.to_string(),
            });
        }
        Ok(Self {
            tag: Some(tag.to_string()),
            ..self.clone()
        })
    }

    /// Returns a copy carrying `digest`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidDigest`] if the digest is malformed.
    pub fn with_digest(&self, digest: &str) -> Result<Self> {
        if !DIGEST_RE.is_match(digest) {
            return Err(ParseError::InvalidDigest {
                digest: digest.to_string(),
            });
        }
        Ok(Self {
            digest: Some(digest.to_string()),
            ..self.clone()
        })
    }

    /// Returns a copy tagged [`DEFAULT_TAG`] if it has neither tag nor digest.
    #[must_use]
    pub fn with_default_tag(&self) -> Self {
        if self.is_name_only() {
            Self {
                tag: Some(DEFAULT_TAG.to_string()),
                ..self.clone()
            }
        } else {
            self.clone()
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.path)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl FromStr for Reference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
