//! # Regis Core
//!
//! The image reference primitive shared by the Regis crates.
//!
//! - [`Reference`] - normalized, fully qualified image reference
//! - [`NameComponents`] - reference split as written, for short-name handling
//! - [`ParseError`] - why an input is not a valid reference
//!
//! ## Example
//!
//! ```rust
//! use regis_core::{NameComponents, Reference};
//!
//! let reference = Reference::parse("quay.io/podman/hello:latest")?;
//! assert_eq!(reference.domain(), "quay.io");
//! assert_eq!(reference.path(), "podman/hello");
//!
//! let short = NameComponents::parse("podman/hello")?;
//! assert!(short.is_short_name());
//! # Ok::<(), regis_core::ParseError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod reference;


pub use error::{ParseError, Result};
pub use reference::{NameComponents, Reference, DEFAULT_DOMAIN, DEFAULT_TAG};
