//! Error types for short-name resolution.

use std::path::PathBuf;

use regis_registries::{AliasValidationError, RegistriesError};
use thiserror::Error;

/// Result type alias using [`ShortNameError`] as the error type.
pub type Result<T> = std::result::Result<T, ShortNameError>;

/// Errors that can occur while resolving short names or editing aliases.
#[derive(Debug, Error)]
pub enum ShortNameError {
    /// The input is empty, malformed, or carries a transport scheme.
    #[error("Invalid image name '{input}': {reason}")]
    InvalidInput {
        /// Rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No alias matched and no unqualified-search registries are configured.
    #[error("Short name '{name}' did not resolve to an alias and no unqualified-search registries are defined")]
    NoSearchRegistries {
        /// Short name as written.
        name: String,
    },

    /// Enforcing mode refused to pick among several search registries.
    #[error(
        "Short name '{name}' is ambiguous in enforcing mode: it may resolve to any of {}",
        .registries.join(", ")
    )]
    AmbiguousShortName {
        /// Short name as written.
        name: String,
        /// Candidate registry locations, in search order.
        registries: Vec<String>,
    },

    /// The alias is declared by the system configuration, not the user.
    #[error("Alias '{name}' is declared in {origin} and cannot be changed by the user")]
    NotUserOwned {
        /// Alias name.
        name: String,
        /// Configuration file that declares it.
        origin: PathBuf,
    },

    /// No user alias with this name exists.
    #[error("Alias '{name}' not found in {path}")]
    AliasNotFound {
        /// Alias name.
        name: String,
        /// User alias file.
        path: PathBuf,
    },

    /// An alias name or value was rejected.
    #[error("Invalid alias: {0}")]
    InvalidAlias(#[from] AliasValidationError),

    /// The user alias file could not be serialized.
    #[error("Failed to serialize aliases for {path}: {source}")]
    Serialize {
        /// User alias file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::ser::Error,
    },

    /// Configuration could not be loaded, or a file could not be read or written.
    #[error(transparent)]
    Config(#[from] RegistriesError),
}
