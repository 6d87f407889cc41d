//! Integration tests for configuration loading and registry resolution.
//!
//! Each test builds a configuration tree (base file plus drop-in directory)
//! in a temporary directory and goes through the public API only.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use regis_core::Reference;
use regis_registries::{
    find_registry, get_registries, load, unqualified_search_registries, ConfigCache,
    EffectiveConfig, RegistriesError, ShortNameMode, SystemContext,
};
use tempfile::TempDir;

const DIGEST: &str = "sha256:0d0b1f7b7c5a38bbd8b5d0d6e2f4ae54b3a4b84a8ef2a4b3e1d6ab7d9d9e6a11";

/// A configuration tree in a temporary directory.
struct ConfigTree {
    dir: TempDir,
}

impl ConfigTree {
    fn new(base: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(dir.path().join("registries.conf"), base).expect("Failed to write base file");
        Self { dir }
    }

    fn dropin(&self, name: &str, contents: &str) -> &Self {
        let dropins = self.dir.path().join("registries.conf.d");
        fs::create_dir_all(&dropins).expect("Failed to create drop-in dir");
        fs::write(dropins.join(name), contents).expect("Failed to write drop-in");
        self
    }

    fn context(&self) -> SystemContext {
        SystemContext::new()
            .with_registries_conf_path(self.dir.path().join("registries.conf"))
            .with_registries_conf_dir_path(self.dir.path().join("registries.conf.d"))
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[test]
fn test_dropin_replaces_search_list() {
    let tree = ConfigTree::new(r#"unqualified-search-registries = ["a.com"]"#);
    tree.dropin("50-search.conf", r#"unqualified-search-registries = ["b.com"]"#);

    let config = load(&tree.context()).unwrap();
    assert_eq!(config.unqualified_search_registry_locations(), ["b.com"]);
}

#[test]
fn test_dropins_applied_in_name_order() {
    let tree = ConfigTree::new("");
    tree.dropin("20-second.conf", r#"short-name-mode = "enforcing""#)
        .dropin("10-first.conf", r#"short-name-mode = "disabled""#);

    let config = load(&tree.context()).unwrap();
    assert_eq!(config.short_name_mode(), ShortNameMode::Enforcing);
}

#[test]
fn test_dropin_keeps_untouched_fields() {
    let tree = ConfigTree::new(
        r#"
        unqualified-search-registries = ["a.com"]
        credential-helpers = ["secretservice"]

        [[registry]]
        location = "a.com"

        [[registry]]
        location = "b.com"
        "#,
    );
    tree.dropin(
        "10-override.conf",
        r#"
        [[registry]]
        location = "b.com"
        blocked = true
        "#,
    );

    let config = load(&tree.context()).unwrap();
    assert_eq!(config.unqualified_search_registry_locations(), ["a.com"]);
    assert_eq!(config.credential_helpers(), ["secretservice"]);
    assert_eq!(config.registries().len(), 2);
    assert!(config.find_registry("b.com/foo").unwrap().blocked());
    assert!(!config.find_registry("a.com/foo").unwrap().blocked());
}

#[test]
fn test_dropin_wins_length_ties() {
    let tree = ConfigTree::new(
        r#"
        [[registry]]
        location = "base-mirror.com"
        prefix = "example.com"
        "#,
    );
    tree.dropin(
        "10-override.conf",
        r#"
        [[registry]]
        location = "dropin-mirror.com"
        prefix = "example.com"
        "#,
    );

    let cache = ConfigCache::new();
    let found = find_registry(&cache, &tree.context(), "example.com/foo:v1")
        .unwrap()
        .unwrap();
    assert_eq!(found.location(), "dropin-mirror.com");
}

#[test]
fn test_conflict_across_files() {
    let tree = ConfigTree::new(
        r#"
        [[registry]]
        location = "registry.com"
        prefix = "example.com/foo"
        insecure = true
        "#,
    );
    tree.dropin(
        "10-conflict.conf",
        r#"
        [[registry]]
        location = "registry.com"
        prefix = "example.com/bar"
        insecure = false
        "#,
    );

    // The drop-in replaces the base entry by location, so no conflict.
    assert!(load(&tree.context()).is_ok());

    let tree = ConfigTree::new(
        r#"
        [[registry]]
        location = "registry.com"
        insecure = true

        [[registry]]
        location = "registry.com"
        prefix = "example.com/bar"
        insecure = false
        "#,
    );
    let err = load(&tree.context()).unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, RegistriesError::Conflict { .. }));
    assert!(message.contains("registry.com"), "{message}");
    assert!(message.contains("insecure"), "{message}");
}

#[test]
fn test_mirror_by_digest_only() {
    let tree = ConfigTree::new(
        r#"
        [[registry]]
        location = "registry.com"
        mirror-by-digest-only = true

        [[registry.mirror]]
        location = "mirror.registry.com"
        "#,
    );

    let cache = ConfigCache::new();
    let ctx = tree.context();
    let registry = find_registry(&cache, &ctx, "registry.com/image:tag")
        .unwrap()
        .unwrap();

    let tagged = Reference::parse("registry.com/image:tag").unwrap();
    let sources = registry.pull_sources(&tagged).unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].endpoint.location, "registry.com");

    let digested = Reference::parse(&format!("registry.com/image@{DIGEST}")).unwrap();
    let sources = registry.pull_sources(&digested).unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].endpoint.location, "mirror.registry.com");
    assert_eq!(
        sources[0].reference.to_string(),
        format!("mirror.registry.com/image@{DIGEST}")
    );
    assert_eq!(sources[1].endpoint.location, "registry.com");
}

#[test]
fn test_prefix_rewrite_to_mirrors() {
    let tree = ConfigTree::new(
        r#"
        [[registry]]
        location = "registry.com:5000/foo"
        prefix = "example.com/bar"

        [[registry.mirror]]
        location = "mirror-1.com/bar"
        insecure = true
        "#,
    );

    let cache = ConfigCache::new();
    let reference = Reference::parse(&format!("example.com/bar/myimage:latest@{DIGEST}")).unwrap();
    let registry = find_registry(&cache, &tree.context(), &reference.to_string())
        .unwrap()
        .unwrap();

    let sources = registry.pull_sources(&reference).unwrap();
    let rewritten: Vec<String> = sources.iter().map(|s| s.reference.to_string()).collect();
    assert_eq!(
        rewritten,
        [
            format!("mirror-1.com/bar/myimage:latest@{DIGEST}"),
            format!("registry.com:5000/foo/myimage:latest@{DIGEST}"),
        ]
    );
    assert!(sources[0].endpoint.insecure);
    assert!(!sources[1].endpoint.insecure);
}

#[test]
fn test_wildcard_prefix() {
    let tree = ConfigTree::new(
        r#"
        [[registry]]
        location = "mirror.internal"
        prefix = "*.example.com"

        [[registry]]
        location = "bad.internal"
        prefix = "*.*.example.com"
        "#,
    );

    let cache = ConfigCache::new();
    let ctx = tree.context();
    let found = find_registry(&cache, &ctx, "a.b.example.com/ns/app:v1")
        .unwrap()
        .unwrap();
    assert_eq!(found.location(), "mirror.internal");

    let sources = found
        .pull_sources(&Reference::parse("a.b.example.com/ns/app:v1").unwrap())
        .unwrap();
    assert_eq!(sources[0].reference.to_string(), "mirror.internal/ns/app:v1");

    assert!(find_registry(&cache, &ctx, "example.com/ns/app").unwrap().is_none());
}

#[test]
fn test_legacy_format() {
    let tree = ConfigTree::new(
        r#"
        [registries.search]
        registries = ["registry-a.com"]

        [registries.insecure]
        registries = ["registry-b.com"]
        "#,
    );

    let cache = ConfigCache::new();
    let ctx = tree.context();
    let registries = get_registries(&cache, &ctx).unwrap();
    assert_eq!(registries.len(), 2);

    let search = unqualified_search_registries(&cache, &ctx).unwrap();
    assert_eq!(search.len(), 1);
    assert_eq!(search[0].location, "registry-a.com");
    assert!(find_registry(&cache, &ctx, "registry-b.com/foo")
        .unwrap()
        .unwrap()
        .insecure());
}

#[test]
fn test_mixing_formats_across_files() {
    let tree = ConfigTree::new(
        r#"
        [registries.search]
        registries = ["registry-a.com"]
        "#,
    );
    tree.dropin(
        "10-structured.conf",
        r#"
        [[registry]]
        location = "registry-b.com"
        "#,
    );

    let err = load(&tree.context()).unwrap_err();
    assert!(
        matches!(&err, RegistriesError::MixedFormats { path } if path.ends_with("10-structured.conf"))
    );
}

#[test]
fn test_missing_files() {
    let dir = TempDir::new().unwrap();

    // An explicitly requested base file must exist.
    let ctx = SystemContext::new()
        .with_registries_conf_path(dir.path().join("missing.conf"))
        .with_registries_conf_dir_path(dir.path().join("missing.d"));
    assert!(matches!(
        load(&ctx).unwrap_err(),
        RegistriesError::MissingConfig { .. }
    ));

    // Implicit system paths under an empty root are simply absent.
    let ctx = SystemContext::new().with_root(dir.path());
    let config = load(&ctx).unwrap();
    assert!(config.registries().is_empty());
    assert!(config.unqualified_search_registries().is_empty());
}

#[test]
fn test_root_prefix_applies_to_system_paths() {
    let dir = TempDir::new().unwrap();
    let etc = dir.path().join("etc/containers");
    fs::create_dir_all(etc.join("registries.conf.d")).unwrap();
    fs::write(
        etc.join("registries.conf"),
        r#"unqualified-search-registries = ["a.com"]"#,
    )
    .unwrap();
    fs::write(
        etc.join("registries.conf.d/10-more.conf"),
        r#"unqualified-search-registries = ["a.com", "b.com"]"#,
    )
    .unwrap();

    let config = load(&SystemContext::new().with_root(dir.path())).unwrap();
    assert_eq!(config.unqualified_search_registry_locations(), ["a.com", "b.com"]);
}

#[test]
fn test_dropin_errors_name_the_file() {
    let tree = ConfigTree::new("");
    tree.dropin("10-broken.conf", "[[registry]]\nlocation = \"https://registry.com\"");

    let err = load(&tree.context()).unwrap_err();
    assert!(matches!(
        &err,
        RegistriesError::InvalidLocation { path, .. } if path.ends_with("10-broken.conf")
    ));
    assert!(err.to_string().contains("URI schemes are not supported"));
}

#[test]
fn test_cache_shared_until_invalidated() {
    let tree = ConfigTree::new(r#"unqualified-search-registries = ["a.com"]"#);
    let ctx = tree.context();
    let cache = ConfigCache::new();

    assert_eq!(
        unqualified_search_registries(&cache, &ctx).unwrap()[0].location,
        "a.com"
    );

    fs::write(
        tree.path().join("registries.conf"),
        r#"unqualified-search-registries = ["b.com"]"#,
    )
    .unwrap();
    assert_eq!(
        unqualified_search_registries(&cache, &ctx).unwrap()[0].location,
        "a.com"
    );

    cache.invalidate();
    assert_eq!(
        unqualified_search_registries(&cache, &ctx).unwrap()[0].location,
        "b.com"
    );
}

#[test]
fn test_concurrent_loads_share_one_config() {
    let tree = ConfigTree::new(r#"unqualified-search-registries = ["a.com"]"#);
    tree.dropin("10-more.conf", r#"short-name-mode = "enforcing""#);
    let ctx = tree.context();
    let cache = ConfigCache::new();

    let loaded: Vec<Arc<EffectiveConfig>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| cache.load(&ctx).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(cache.len(), 1);
    for config in &loaded {
        assert!(Arc::ptr_eq(config, &loaded[0]));
    }
    assert_eq!(loaded[0].short_name_mode(), ShortNameMode::Enforcing);
}
