//! Error types for reference parsing.
//!
//! This module defines the error type returned by the [`Reference`](crate::Reference)
//! and [`NameComponents`](crate::NameComponents) parsers.

use thiserror::Error;

/// Result type alias using [`ParseError`] as the error type.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while parsing an image reference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input was empty or whitespace only.
    #[error("Invalid reference: input is empty")]
    Empty,

    /// The input does not follow the reference grammar.
    #[error("Invalid reference format: {input}")]
    InvalidFormat {
        /// The rejected input.
        input: String,
    },

    /// The repository name exceeds the maximum length.
    #[error("Repository name must not be more than {max} characters: {input}")]
    NameTooLong {
        /// The rejected input.
        input: String,
        /// Maximum accepted length.
        max: usize,
    },

    /// The input lacks an explicit registry domain.
    #[error("Reference is not fully qualified: {input}")]
    NotQualified {
        /// The rejected input.
        input: String,
    },

    /// A tag did not follow the tag grammar.
    #[error("Invalid tag format: {tag}")]
    InvalidTag {
        /// The rejected tag.
        tag: String,
    },

    /// A digest did not follow the digest grammar.
    #[error("Invalid digest format: {digest}")]
    InvalidDigest {
        /// The rejected digest.
        digest: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_format() {
        let err = ParseError::InvalidFormat {
            input: "Invalid#$".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid reference format: Invalid#$");
    }

    #[test]
    fn test_error_display_not_qualified() {
        let err = ParseError::NotQualified {
            input: "library/fedora".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Reference is not fully qualified: library/fedora"
        );
    }

    #[test]
    fn test_error_display_empty() {
        assert_eq!(
            ParseError::Empty.to_string(),
            "Invalid reference: input is empty"
        );
    }
}
