//! Loading and merging of a base configuration file and its drop-ins.
//!
//! Every file is parsed into a [`PartialConfig`] on its own. The partials are
//! then folded left to right with [`merge`], base file first and drop-ins in
//! file-name order, and the result is validated once as a whole.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::aliases::{parse_alias_value, validate_short_name, AliasEntry};
use crate::context::{ShortNameMode, SystemContext};
use crate::error::{RegistriesError, Result};
use crate::file::{ConfigFile, LegacyTables, RegistryTable};
use crate::location::{parse_location, parse_prefix};
use crate::matcher::PrefixPattern;
use crate::registry::{EffectiveConfig, Endpoint, Registry, DEFAULT_CREDENTIAL_HELPER};

/// How a file declared its registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Legacy,
    Structured,
}

/// The contribution of one or more files, before validation as a whole.
///
/// `None` fields were not set by any file seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialConfig {
    registries: Vec<Registry>,
    unqualified_search_registries: Option<Vec<String>>,
    short_name_mode: Option<ShortNameMode>,
    credential_helpers: Option<Vec<String>>,
    aliases: BTreeMap<String, AliasEntry>,
    format: Option<Format>,
}

/// Applies `overlay` on top of `base`.
///
/// - Registries: every base entry whose location the overlay declares is
///   dropped; the remaining base entries are followed by the overlay's.
/// - Search list, short-name mode, credential helpers: replaced wholesale
///   when the overlay sets them.
/// - Aliases: merged per key, the overlay winning.
#[must_use]
pub fn merge(base: PartialConfig, overlay: PartialConfig) -> PartialConfig {
    let mut registries: Vec<Registry> = base
        .registries
        .into_iter()
        .filter(|registry| {
            !overlay
                .registries
                .iter()
                .any(|other| other.location() == registry.location())
        })
        .collect();
    registries.extend(overlay.registries);

    let mut aliases = base.aliases;
    aliases.extend(overlay.aliases);

    PartialConfig {
        registries,
        unqualified_search_registries: overlay
            .unqualified_search_registries
            .or(base.unqualified_search_registries),
        short_name_mode: overlay.short_name_mode.or(base.short_name_mode),
        credential_helpers: overlay.credential_helpers.or(base.credential_helpers),
        aliases,
        format: overlay.format.or(base.format),
    }
}

/// Parses one configuration file.
///
/// # Errors
///
/// Returns an error if the contents are not valid TOML for the configuration
/// schema, if a location, mode or alias is invalid, or if the file mixes the
/// legacy and structured registry formats.
pub fn parse_config(contents: &str, path: &Path) -> Result<PartialConfig> {
    let file: ConfigFile = toml::from_str(contents).map_err(|source| RegistriesError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    let (registries, format) = match (file.legacy.is_empty(), file.registry_tables.is_empty()) {
        (false, false) => {
            return Err(RegistriesError::MixedFormats {
                path: path.to_path_buf(),
            })
        }
        (false, true) => (legacy_registries(&file.legacy, path)?, Some(Format::Legacy)),
        (true, false) => (
            file.registry_tables
                .iter()
                .map(|table| structured_registry(table, path))
                .collect::<Result<Vec<_>>>()?,
            Some(Format::Structured),
        ),
        (true, true) => (Vec::new(), None),
    };

    let unqualified_search_registries = file
        .unqualified_search_registries
        .map(|locations| {
            locations
                .iter()
                .map(|location| checked_location(location, path))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?;

    let short_name_mode = file
        .short_name_mode
        .map(|mode| {
            mode.parse::<ShortNameMode>()
                .map_err(|source| RegistriesError::InvalidShortNameMode {
                    path: path.to_path_buf(),
                    value: mode,
                    source,
                })
        })
        .transpose()?;

    let mut aliases = BTreeMap::new();
    for (name, value) in file.aliases {
        let invalid = |source| RegistriesError::InvalidAlias {
            path: path.to_path_buf(),
            source,
        };
        validate_short_name(&name).map_err(invalid)?;
        let value = parse_alias_value(&value).map_err(invalid)?;
        aliases.insert(
            name,
            AliasEntry {
                value,
                origin: path.to_path_buf(),
            },
        );
    }

    Ok(PartialConfig {
        registries,
        unqualified_search_registries,
        short_name_mode,
        credential_helpers: file.credential_helpers,
        aliases,
        format,
    })
}

fn checked_location(value: &str, path: &Path) -> Result<String> {
    parse_location(value).map_err(|reason| invalid_location(value, reason, path))
}

fn invalid_location(value: &str, reason: &str, path: &Path) -> RegistriesError {
    RegistriesError::InvalidLocation {
        path: path.to_path_buf(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn structured_registry(table: &RegistryTable, path: &Path) -> Result<Registry> {
    let location = checked_location(&table.location, path)?;
    let prefix = match &table.prefix {
        Some(prefix) => {
            parse_prefix(prefix).map_err(|reason| invalid_location(prefix, reason, path))?
        }
        None => location.clone(),
    };

    let mut registry = Registry::new(location)
        .with_prefix(&prefix)
        .with_insecure(table.insecure)
        .with_blocked(table.blocked)
        .with_searchable(table.unqualified_search)
        .with_mirror_by_digest_only(table.mirror_by_digest_only);

    for mirror in &table.mirrors {
        let mut endpoint = Endpoint::new(checked_location(&mirror.location, path)?);
        endpoint.insecure = mirror.insecure;
        registry = registry.with_mirror(endpoint);
    }

    if let PrefixPattern::Unmatchable(pattern) = registry.pattern() {
        tracing::warn!(
            path = %path.display(),
            prefix = %pattern,
            "Unsupported wildcard prefix, registry will never match"
        );
    }

    Ok(registry)
}

/// Turns the flat legacy host lists into registries, in order of first
/// appearance (search, then block, then insecure).
fn legacy_registries(legacy: &LegacyTables, path: &Path) -> Result<Vec<Registry>> {
    let mut order: Vec<String> = Vec::new();
    let mut flags: HashMap<String, (bool, bool, bool)> = HashMap::new();

    let lists = [
        (&legacy.search.registries, 0),
        (&legacy.block.registries, 1),
        (&legacy.insecure.registries, 2),
    ];
    for (hosts, flag) in lists {
        for host in hosts {
            let location = checked_location(host, path)?;
            let entry = flags.entry(location.clone()).or_insert_with(|| {
                order.push(location);
                (false, false, false)
            });
            match flag {
                0 => entry.0 = true,
                1 => entry.1 = true,
                _ => entry.2 = true,
            }
        }
    }

    Ok(order
        .into_iter()
        .map(|location| {
            let (search, blocked, insecure) = flags.get(&location).copied().unwrap_or_default();
            Registry::new(location)
                .with_searchable(search)
                .with_blocked(blocked)
                .with_insecure(insecure)
        })
        .collect())
}

/// Validates the merged configuration and fills in defaults.
///
/// # Errors
///
/// Returns [`RegistriesError::Conflict`] if two entries for the same location
/// disagree on `insecure` or `blocked`.
pub fn finalize(partial: PartialConfig) -> Result<EffectiveConfig> {
    let mut first_seen: HashMap<&str, &Registry> = HashMap::new();
    for registry in &partial.registries {
        let first = *first_seen.entry(registry.location()).or_insert(registry);
        for (field, a, b) in [
            ("insecure", first.insecure(), registry.insecure()),
            ("blocked", first.blocked(), registry.blocked()),
        ] {
            if a != b {
                return Err(RegistriesError::Conflict {
                    location: registry.location().to_string(),
                    field,
                    first: a,
                    second: b,
                });
            }
        }
    }

    let unqualified_search_registries = partial.unqualified_search_registries.unwrap_or_else(|| {
        let mut locations: Vec<String> = Vec::new();
        for registry in partial.registries.iter().filter(|r| r.searchable()) {
            if !locations.iter().any(|l| l == registry.location()) {
                locations.push(registry.location().to_string());
            }
        }
        locations
    });

    let credential_helpers = partial
        .credential_helpers
        .filter(|helpers| !helpers.is_empty())
        .unwrap_or_else(|| vec![DEFAULT_CREDENTIAL_HELPER.to_string()]);

    Ok(EffectiveConfig {
        registries: partial.registries,
        unqualified_search_registries,
        short_name_mode: partial.short_name_mode.unwrap_or_default(),
        credential_helpers,
        aliases: partial.aliases,
    })
}

/// Loads the effective configuration described by `ctx`.
///
/// # Errors
///
/// See [`load_paths`].
pub fn load(ctx: &SystemContext) -> Result<EffectiveConfig> {
    load_paths(
        &ctx.registries_conf_path(),
        ctx.is_registries_conf_path_explicit(),
        &ctx.registries_conf_dir_path(),
    )
}

/// Loads `base_path`, then every file in `dropin_dir` in file-name order.
///
/// A missing base file is an empty configuration unless `required` is set. A
/// missing drop-in directory means no drop-ins.
///
/// # Errors
///
/// Returns an error if a file cannot be read or parsed, if the files mix the
/// legacy and structured registry formats, or if the merged registries
/// conflict.
pub fn load_paths(base_path: &Path, required: bool, dropin_dir: &Path) -> Result<EffectiveConfig> {
    let mut merged = match fs::read_to_string(base_path) {
        Ok(contents) => {
            tracing::debug!(path = %base_path.display(), "Loaded registry configuration");
            parse_config(&contents, base_path)?
        }
        Err(e) if e.kind() == ErrorKind::NotFound && !required => {
            tracing::debug!(
                path = %base_path.display(),
                "No registry configuration found, using defaults"
            );
            PartialConfig::default()
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(RegistriesError::MissingConfig {
                path: base_path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(RegistriesError::Io {
                path: base_path.to_path_buf(),
                source,
            })
        }
    };

    for path in dropin_files(dropin_dir)? {
        let contents = fs::read_to_string(&path).map_err(|source| RegistriesError::Io {
            path: path.clone(),
            source,
        })?;
        let overlay = parse_config(&contents, &path)?;
        if let (Some(a), Some(b)) = (merged.format, overlay.format) {
            if a != b {
                return Err(RegistriesError::MixedFormats { path });
            }
        }
        tracing::debug!(path = %path.display(), "Applied registry configuration drop-in");
        merged = merge(merged, overlay);
    }

    let config = finalize(merged)?;
    tracing::info!(
        path = %base_path.display(),
        registries = config.registries().len(),
        search_registries = config.unqualified_search_registry_locations().len(),
        "Registry configuration loaded"
    );
    Ok(config)
}

/// Lists the drop-in files of `dir` in file-name order.
fn dropin_files(dir: &Path) -> Result<Vec<PathBuf>> {
    match fs::metadata(dir) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "No drop-in directory");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(RegistriesError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
        Ok(_) => {}
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            RegistriesError::Io {
                path,
                source: e.into(),
            }
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    tracing::debug!(dir = %dir.display(), count = files.len(), "Found drop-in files");
    Ok(files)
}
