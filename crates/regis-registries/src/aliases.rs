//! Short-name alias values and their validation.
//!
//! Aliases map a short name such as `fedora` to a fully qualified repository
//! such as `registry.fedoraproject.org/fedora`. Both sides must be bare
//! names: tags and digests come from the user input at resolution time.

use std::path::PathBuf;

use regis_core::{NameComponents, ParseError, Reference};
use thiserror::Error;

/// Why an alias name or value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasValidationError {
    /// The name or value is not a valid reference.
    #[error("'{input}' is not a valid reference: {source}")]
    Parse {
        /// Rejected input.
        input: String,
        /// Underlying parse error.
        #[source]
        source: ParseError,
    },

    /// The name or value carries a tag or digest.
    #[error("'{input}' must not carry a tag or digest")]
    TaggedOrDigested {
        /// Rejected input.
        input: String,
    },

    /// The alias name names a registry.
    #[error("alias name '{name}' is not a short name: it names registry '{domain}'")]
    QualifiedName {
        /// Rejected name.
        name: String,
        /// Registry domain found in the name.
        domain: String,
    },

    /// The alias value lacks a registry domain.
    #[error("alias value '{value}' must include a registry domain")]
    UnqualifiedValue {
        /// Rejected value.
        value: String,
    },
}

/// What an alias resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasValue {
    /// A fully qualified repository without tag or digest.
    Target(Reference),

    /// Suppresses an alias declared by an earlier configuration layer.
    Tombstone,
}

impl AliasValue {
    /// Returns the target, or `None` for a tombstone.
    #[must_use]
    pub const fn target(&self) -> Option<&Reference> {
        match self {
            Self::Target(reference) => Some(reference),
            Self::Tombstone => None,
        }
    }

    /// Returns the configuration-file spelling of the value.
    #[must_use]
    pub fn to_config_string(&self) -> String {
        match self {
            Self::Target(reference) => reference.to_string(),
            Self::Tombstone => String::new(),
        }
    }
}

/// An alias value together with the file that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    /// Resolved value.
    pub value: AliasValue,

    /// File that declared the alias.
    pub origin: PathBuf,
}

/// Checks that `name` can be used as an alias key.
///
/// # Errors
///
/// Returns an error if `name` is not a valid reference, carries a tag or
/// digest, or names a registry.
///
/// # Examples
///
/// ```
/// use regis_registries::validate_short_name;
///
/// assert!(validate_short_name("library/fedora").is_ok());
/// assert!(validate_short_name("fedora:latest").is_err());
/// assert!(validate_short_name("quay.io/fedora").is_err());
/// ```
pub fn validate_short_name(name: &str) -> Result<(), AliasValidationError> {
    let components = parse_components(name)?;
    if !components.is_name_only() {
        return Err(AliasValidationError::TaggedOrDigested {
            input: name.to_string(),
        });
    }
    if let Some(domain) = components.explicit_domain() {
        return Err(AliasValidationError::QualifiedName {
            name: name.to_string(),
            domain: domain.to_string(),
        });
    }
    Ok(())
}

/// Parses the right-hand side of an alias.
///
/// An empty (or whitespace-only) value yields [`AliasValue::Tombstone`].
///
/// # Errors
///
/// Returns an error if the value is not a fully qualified reference or
/// carries a tag or digest.
pub fn parse_alias_value(value: &str) -> Result<AliasValue, AliasValidationError> {
    if value.trim().is_empty() {
        return Ok(AliasValue::Tombstone);
    }
    parse_alias_target(value).map(AliasValue::Target)
}

/// Parses an alias target, which must be a qualified, untagged repository.
///
/// `docker.io` targets are normalized (`docker.io/fedora` becomes
/// `docker.io/library/fedora`).
///
/// # Errors
///
/// Returns an error if the value is empty, malformed, unqualified, or
/// carries a tag or digest.
pub fn parse_alias_target(value: &str) -> Result<Reference, AliasValidationError> {
    let components = parse_components(value)?;
    if !components.is_name_only() {
        return Err(AliasValidationError::TaggedOrDigested {
            input: value.to_string(),
        });
    }
    if components.is_short_name() {
        return Err(AliasValidationError::UnqualifiedValue {
            value: value.to_string(),
        });
    }
    Ok(Reference::from_components(components))
}

fn parse_components(input: &str) -> Result<NameComponents, AliasValidationError> {
    NameComponents::parse(input).map_err(|source| AliasValidationError::Parse {
        input: input.to_string(),
        source,
    })
}
