//! On-disk layout of `registries.conf` and its drop-ins.

use std::collections::BTreeMap;

use serde::Deserialize;

/// One configuration file as written.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct ConfigFile {
    /// `[[registry]]` tables.
    #[serde(default, rename = "registry")]
    pub registry_tables: Vec<RegistryTable>,

    /// Legacy `[registries.search|insecure|block]` tables.
    #[serde(default, rename = "registries")]
    pub legacy: LegacyTables,

    pub unqualified_search_registries: Option<Vec<String>>,

    pub short_name_mode: Option<String>,

    pub credential_helpers: Option<Vec<String>>,

    /// `[aliases]` table; an empty value is a tombstone.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// A `[[registry]]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct RegistryTable {
    #[serde(default, alias = "url")]
    pub location: String,

    pub prefix: Option<String>,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default)]
    pub blocked: bool,

    #[serde(default)]
    pub unqualified_search: bool,

    #[serde(default)]
    pub mirror_by_digest_only: bool,

    #[serde(default, rename = "mirror")]
    pub mirrors: Vec<MirrorTable>,
}

/// A `[[registry.mirror]]` table.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MirrorTable {
    #[serde(default, alias = "url")]
    pub location: String,

    #[serde(default)]
    pub insecure: bool,
}

/// The legacy flat host lists.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LegacyTables {
    #[serde(default)]
    pub search: LegacyList,

    #[serde(default)]
    pub insecure: LegacyList,

    #[serde(default)]
    pub block: LegacyList,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LegacyList {
    #[serde(default)]
    pub registries: Vec<String>,
}

impl LegacyTables {
    pub fn is_empty(&self) -> bool {
        self.search.registries.is_empty()
            && self.insecure.registries.is_empty()
            && self.block.registries.is_empty()
    }
}
