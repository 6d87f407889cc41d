//! The user-owned alias file and lookups across both alias layers.
//!
//! Aliases come from two places. The `[aliases]` tables of the system
//! configuration are read-only here. The user alias file is a separate TOML
//! file with the same `[aliases]` table, created on first write.
//!
//! Lookups consult the user file first. A tombstone (empty value) in either
//! layer ends the lookup with no alias.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regis_core::Reference;
use regis_registries::{
    parse_alias_value, AliasEntry, AliasValue, EffectiveConfig, RegistriesError, SystemContext,
};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Result, ShortNameError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct AliasFile {
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

/// One lock per alias file path, shared by every store in the process.
static FILE_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = Lazy::new(Mutex::default);

fn file_lock(path: &Path) -> Arc<Mutex<()>> {
    Arc::clone(FILE_LOCKS.lock().entry(path.to_path_buf()).or_default())
}

/// Read-write access to the user alias file.
///
/// All stores for the same path in this process share one lock, so
/// read-modify-write cycles never interleave. Each write goes to a fresh
/// temporary file that is renamed into place. Nothing guards against other
/// processes.
#[derive(Debug)]
pub struct AliasStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl AliasStore {
    /// Creates a store backed by `path`. The file need not exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = file_lock(&path);
        Self { path, lock }
    }

    /// Creates a store for the user alias file named by `ctx`.
    #[must_use]
    pub fn for_context(ctx: &SystemContext) -> Self {
        Self::new(ctx.user_short_name_alias_conf_path())
    }

    /// Returns the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns every user alias, tombstones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or holds an
    /// invalid alias.
    pub fn aliases(&self) -> Result<BTreeMap<String, AliasEntry>> {
        let _guard = self.lock.lock();
        let file = self.read()?;
        file.aliases
            .into_iter()
            .map(|(name, value)| -> Result<(String, AliasEntry)> {
                let value =
                    parse_alias_value(&value).map_err(|source| RegistriesError::InvalidAlias {
                        path: self.path.clone(),
                        source,
                    })?;
                Ok((
                    name,
                    AliasEntry {
                        value,
                        origin: self.path.clone(),
                    },
                ))
            })
            .collect()
    }

    /// Looks `name` up in the user file, then in `config`.
    ///
    /// Returns the alias target and the file that declared it, or `None` if
    /// neither layer has an alias or the first match is a tombstone.
    ///
    /// # Errors
    ///
    /// Returns an error if the user file cannot be read.
    pub fn lookup(
        &self,
        config: &EffectiveConfig,
        name: &str,
    ) -> Result<Option<(Reference, PathBuf)>> {
        let user = self.aliases()?;
        let entry = user.get(name).or_else(|| config.alias(name));
        Ok(entry.and_then(|entry| match &entry.value {
            AliasValue::Target(target) => Some((target.clone(), entry.origin.clone())),
            AliasValue::Tombstone => None,
        }))
    }

    /// Sets the user alias `name` to `target`, replacing any previous value.
    ///
    /// The caller validates both sides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn add(&self, name: &str, target: &Reference) -> Result<()> {
        let _guard = self.lock.lock();
        let mut file = self.read()?;
        file.aliases.insert(name.to_string(), target.to_string());
        self.write(&file)?;
        tracing::info!(
            name,
            target = %target,
            path = %self.path.display(),
            "Added short-name alias"
        );
        Ok(())
    }

    /// Removes the user alias `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ShortNameError::NotUserOwned`] if only `config` declares the
    /// alias, [`ShortNameError::AliasNotFound`] if no layer does, or an error
    /// if the file cannot be read or written.
    pub fn remove(&self, config: &EffectiveConfig, name: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut file = self.read()?;
        if file.aliases.remove(name).is_none() {
            return Err(match config.alias(name) {
                Some(entry) if entry.value.target().is_some() => ShortNameError::NotUserOwned {
                    name: name.to_string(),
                    origin: entry.origin.clone(),
                },
                _ => ShortNameError::AliasNotFound {
                    name: name.to_string(),
                    path: self.path.clone(),
                },
            });
        }
        self.write(&file)?;
        tracing::info!(name, path = %self.path.display(), "Removed short-name alias");
        Ok(())
    }

    fn read(&self) -> Result<AliasFile> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(AliasFile::default()),
            Err(source) => return Err(io_error(&self.path, source)),
        };
        toml::from_str(&contents).map_err(|source| {
            ShortNameError::from(RegistriesError::Toml {
                path: self.path.clone(),
                source,
            })
        })
    }

    /// Writes through a uniquely named temporary file in the same directory
    /// and renames it into place.
    fn write(&self, file: &AliasFile) -> Result<()> {
        let contents = toml::to_string(file).map_err(|source| ShortNameError::Serialize {
            path: self.path.clone(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| io_error(dir, e))?;
        temp.write_all(contents.as_bytes())
            .map_err(|e| io_error(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| io_error(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| io_error(&self.path, e.error))?;
        Ok(())
    }
}

fn io_error(path: &Path, source: io::Error) -> ShortNameError {
    RegistriesError::Io {
        path: path.to_path_buf(),
        source,
    }
    .into()
}
