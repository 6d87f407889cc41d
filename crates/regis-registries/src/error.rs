//! Error types for registry configuration operations.

use std::path::PathBuf;

use regis_core::ParseError;
use thiserror::Error;

use crate::aliases::AliasValidationError;
use crate::context::UnknownShortNameMode;

/// Result type alias using [`RegistriesError`] as the error type.
pub type Result<T> = std::result::Result<T, RegistriesError>;

/// Errors that can occur while loading configuration or resolving registries.
#[derive(Debug, Error)]
pub enum RegistriesError {
    /// A configuration file or directory could not be read.
    #[error("Failed to read registry configuration at {path}: {source}")]
    Io {
        /// File or directory path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An explicitly requested configuration file does not exist.
    #[error("Registry configuration not found: {path}")]
    MissingConfig {
        /// Requested path.
        path: PathBuf,
    },

    /// A configuration file is not valid TOML for the expected schema.
    #[error("Failed to parse registry configuration at {path}: {source}")]
    Toml {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },

    /// A registry, prefix, mirror or search location is malformed.
    #[error("Invalid location '{value}' in {path}: {reason}")]
    InvalidLocation {
        /// File that declared the location.
        path: PathBuf,
        /// Rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// `short-name-mode` holds an unknown value.
    #[error("Invalid short-name-mode '{value}' in {path}: {source}")]
    InvalidShortNameMode {
        /// File that declared the mode.
        path: PathBuf,
        /// Rejected value.
        value: String,
        /// Underlying parse error.
        #[source]
        source: UnknownShortNameMode,
    },

    /// An `[aliases]` entry is malformed.
    #[error("Invalid alias in {path}: {source}")]
    InvalidAlias {
        /// File that declared the alias.
        path: PathBuf,
        /// Why it was rejected.
        #[source]
        source: AliasValidationError,
    },

    /// Legacy `[registries.*]` tables were combined with `[[registry]]` tables.
    #[error("Mixing legacy [registries.*] tables with [[registry]] tables is not supported (in {path})")]
    MixedFormats {
        /// File that introduced the mix.
        path: PathBuf,
    },

    /// Two entries for the same location disagree on a security flag.
    #[error(
        "registry '{location}' is defined multiple times with conflicting '{field}' setting ({first} vs {second})"
    )]
    Conflict {
        /// Normalized registry location.
        location: String,
        /// Conflicting field (`insecure` or `blocked`).
        field: &'static str,
        /// Value of the first entry.
        first: bool,
        /// Value of the conflicting entry.
        second: bool,
    },

    /// A reference was rewritten with a registry whose prefix it does not match.
    #[error("Reference '{reference}' does not match registry prefix '{prefix}'")]
    PrefixMismatch {
        /// Reference string.
        reference: String,
        /// Registry prefix.
        prefix: String,
    },

    /// A rewritten reference failed to re-parse.
    #[error("Rewriting produced an invalid reference '{candidate}': {source}")]
    Rewrite {
        /// Rewritten candidate string.
        candidate: String,
        /// Underlying parse error.
        #[source]
        source: ParseError,
    },
}
