//! Where configuration lives and how resolution is tuned.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

/// Path to the system-wide registry configuration file.
pub const SYSTEM_REGISTRIES_CONF_PATH: &str = "/etc/containers/registries.conf";

/// Path to the system-wide drop-in directory.
pub const SYSTEM_REGISTRIES_CONF_DIR_PATH: &str = "/etc/containers/registries.conf.d";

/// User alias file, relative to the user's configuration directory.
pub const USER_SHORT_NAME_ALIAS_CONF_PATH: &str = "containers/short-name-aliases.conf";

/// How strictly short names are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ShortNameMode {
    /// Try every unqualified-search registry in order.
    Disabled,

    /// Like `Disabled`; interactive callers may prompt instead.
    #[default]
    Permissive,

    /// Refuse to pick silently among several search registries.
    Enforcing,
}

impl ShortNameMode {
    /// Returns the configuration-file spelling of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Permissive => "permissive",
            Self::Enforcing => "enforcing",
        }
    }
}

impl fmt::Display for ShortNameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown short-name mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown short-name mode '{0}'")]
pub struct UnknownShortNameMode(pub String);

impl FromStr for ShortNameMode {
    type Err = UnknownShortNameMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Self::Disabled),
            "permissive" => Ok(Self::Permissive),
            "enforcing" => Ok(Self::Enforcing),
            other => Err(UnknownShortNameMode(other.to_string())),
        }
    }
}

/// Caller-supplied paths and overrides for configuration lookup.
///
/// Every field is optional; unset fields fall back to the system defaults.
///
/// # Examples
///
/// ```
/// use regis_registries::{ShortNameMode, SystemContext};
///
/// let ctx = SystemContext::new()
///     .with_registries_conf_path("/tmp/registries.conf")
///     .with_short_name_mode(ShortNameMode::Enforcing);
/// assert!(ctx.is_registries_conf_path_explicit());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SystemContext {
    /// Base configuration file.
    pub registries_conf_path: Option<PathBuf>,

    /// Drop-in directory.
    pub registries_conf_dir_path: Option<PathBuf>,

    /// Root prepended to the implicit system paths.
    pub root_for_implicit_absolute_paths: Option<PathBuf>,

    /// User-owned alias file.
    pub user_short_name_alias_conf_path: Option<PathBuf>,

    /// Overrides the configured short-name mode.
    pub short_name_mode: Option<ShortNameMode>,
}

/// Key under which an effective configuration is cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Resolved base configuration path.
    pub registries_conf: PathBuf,

    /// Resolved drop-in directory path.
    pub registries_conf_dir: PathBuf,
}

impl SystemContext {
    /// Creates a context that uses the system defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base configuration file.
    #[must_use]
    pub fn with_registries_conf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registries_conf_path = Some(path.into());
        self
    }

    /// Sets the drop-in directory.
    #[must_use]
    pub fn with_registries_conf_dir_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registries_conf_dir_path = Some(path.into());
        self
    }

    /// Sets the root used for implicit system paths.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_for_implicit_absolute_paths = Some(root.into());
        self
    }

    /// Sets the user alias file.
    #[must_use]
    pub fn with_user_short_name_alias_conf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_short_name_alias_conf_path = Some(path.into());
        self
    }

    /// Overrides the configured short-name mode.
    #[must_use]
    pub const fn with_short_name_mode(mut self, mode: ShortNameMode) -> Self {
        self.short_name_mode = Some(mode);
        self
    }

    /// Returns true if the caller asked for a specific base file.
    #[must_use]
    pub const fn is_registries_conf_path_explicit(&self) -> bool {
        self.registries_conf_path.is_some()
    }

    /// Returns the base configuration path to read.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use regis_registries::SystemContext;
    ///
    /// let ctx = SystemContext::new().with_root("/mnt/sysroot");
    /// assert_eq!(
    ///     ctx.registries_conf_path(),
    ///     PathBuf::from("/mnt/sysroot/etc/containers/registries.conf")
    /// );
    /// ```
    #[must_use]
    pub fn registries_conf_path(&self) -> PathBuf {
        self.registries_conf_path
            .clone()
            .unwrap_or_else(|| self.implicit_path(SYSTEM_REGISTRIES_CONF_PATH))
    }

    /// Returns the drop-in directory to enumerate.
    #[must_use]
    pub fn registries_conf_dir_path(&self) -> PathBuf {
        self.registries_conf_dir_path
            .clone()
            .unwrap_or_else(|| self.implicit_path(SYSTEM_REGISTRIES_CONF_DIR_PATH))
    }

    /// Returns the user alias file path.
    #[must_use]
    pub fn user_short_name_alias_conf_path(&self) -> PathBuf {
        self.user_short_name_alias_conf_path
            .clone()
            .unwrap_or_else(|| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(USER_SHORT_NAME_ALIAS_CONF_PATH)
            })
    }

    /// Returns the key this context's configuration is cached under.
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            registries_conf: resolve_path(&self.registries_conf_path()),
            registries_conf_dir: resolve_path(&self.registries_conf_dir_path()),
        }
    }

    fn implicit_path(&self, default: &str) -> PathBuf {
        match &self.root_for_implicit_absolute_paths {
            Some(root) => {
                let default = Path::new(default);
                root.join(default.strip_prefix("/").unwrap_or(default))
            }
            None => PathBuf::from(default),
        }
    }
}

/// Canonicalizes paths that exist; keeps the others as given.
fn resolve_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
