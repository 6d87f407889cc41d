//! Integration tests for short-name resolution.
//!
//! Configurations are written to a temporary directory; every test uses its
//! own cache and user alias file.

use std::fs;

use regis_registries::{ConfigCache, ShortNameMode, SystemContext};
use regis_shortnames::{
    add_alias, remove_alias, resolve, resolve_locally, Rationale, ShortNameError,
    ShortNameResolver,
};
use tempfile::TempDir;

const DIGEST: &str = "sha256:d366a4665ab44f0648d7a00ae3fae139d55e32f9712c67accd604bb55df9d05a";

const NO_REG: &str = r#"
[aliases]
"repo/image" = "quay.io/repo/image"
"#;

const ONE_REG: &str = r#"
unqualified-search-registries = ["quay.io"]

[aliases]
"repo/image" = "quay.io/repo/image"
"#;

const TWO_REG: &str = r#"
unqualified-search-registries = ["quay.io", "registry.com"]

[aliases]
"repo/image" = "quay.io/repo/image"
"#;

/// A registries.conf plus user alias file in a temporary directory.
struct Setup {
    dir: TempDir,
    cache: ConfigCache,
}

impl Setup {
    fn new(conf: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(dir.path().join("registries.conf"), conf).expect("Failed to write config");
        Self {
            dir,
            cache: ConfigCache::new(),
        }
    }

    fn context(&self) -> SystemContext {
        SystemContext::new()
            .with_registries_conf_path(self.dir.path().join("registries.conf"))
            .with_registries_conf_dir_path(self.dir.path().join("registries.conf.d"))
            .with_user_short_name_alias_conf_path(self.dir.path().join("short-name-aliases.conf"))
    }

    fn resolver(&self) -> ShortNameResolver<'_> {
        ShortNameResolver::new(&self.cache, self.context())
    }
}

#[test]
fn test_varying_short_name_modes() {
    use ShortNameMode::{Disabled, Enforcing, Permissive};

    // (config, mode, input, expected candidate count; None means failure)
    let cases = [
        (NO_REG, Permissive, "repo/image", Some(1)),
        (ONE_REG, Permissive, "repo/image", Some(1)),
        (TWO_REG, Permissive, "repo/image", Some(1)),
        (NO_REG, Permissive, "doesnotexist", None),
        (ONE_REG, Permissive, "doesnotexist", Some(1)),
        (TWO_REG, Permissive, "doesnotexist", Some(2)),
        (NO_REG, Disabled, "repo/image", Some(1)),
        (ONE_REG, Disabled, "repo/image", Some(1)),
        (TWO_REG, Disabled, "repo/image", Some(1)),
        (NO_REG, Disabled, "doesnotexist", None),
        (ONE_REG, Disabled, "doesnotexist", Some(1)),
        (TWO_REG, Disabled, "doesnotexist", Some(2)),
        (NO_REG, Enforcing, "repo/image", Some(1)),
        (ONE_REG, Enforcing, "repo/image", Some(1)),
        (TWO_REG, Enforcing, "repo/image", Some(1)),
        (NO_REG, Enforcing, "doesnotexist", None),
        (ONE_REG, Enforcing, "doesnotexist", Some(1)),
        (TWO_REG, Enforcing, "doesnotexist", None),
    ];

    for (conf, mode, input, expected) in cases {
        let setup = Setup::new(conf);
        let ctx = setup.context().with_short_name_mode(mode);
        let result = resolve(&setup.cache, &ctx, input);
        match expected {
            Some(count) => {
                let resolved = result.unwrap_or_else(|e| panic!("{mode} {input}: {e}"));
                assert_eq!(resolved.candidates.len(), count, "{mode} {input}");
            }
            None => assert!(result.is_err(), "{mode} {input} should fail"),
        }
    }
}

#[test]
fn test_mode_errors() {
    let setup = Setup::new("");
    let ctx = setup.context().with_short_name_mode(ShortNameMode::Enforcing);
    assert!(matches!(
        resolve(&setup.cache, &ctx, "foo"),
        Err(ShortNameError::NoSearchRegistries { .. })
    ));

    let setup = Setup::new(TWO_REG);
    let ctx = setup.context().with_short_name_mode(ShortNameMode::Enforcing);
    let err = resolve(&setup.cache, &ctx, "foo").unwrap_err();
    assert!(matches!(
        &err,
        ShortNameError::AmbiguousShortName { registries, .. } if registries == &["quay.io", "registry.com"]
    ));

    let ctx = setup.context().with_short_name_mode(ShortNameMode::Permissive);
    let resolved = resolve(&setup.cache, &ctx, "foo").unwrap();
    let values: Vec<String> = resolved.candidates.iter().map(|c| c.value.to_string()).collect();
    assert_eq!(values, ["quay.io/foo:latest", "registry.com/foo:latest"]);
    assert!(resolved.candidates.iter().all(|c| c.recordable));
}

#[test]
fn test_resolve_and_record() {
    let setup = Setup::new(TWO_REG);
    let resolver = setup.resolver();

    let digested = format!("foo@{DIGEST}");
    let cases = [
        ("foo", vec!["quay.io/foo:latest".to_string(), "registry.com/foo:latest".to_string()]),
        ("foo:tag", vec!["quay.io/foo:tag".to_string(), "registry.com/foo:tag".to_string()]),
        (
            digested.as_str(),
            vec![
                format!("quay.io/foo@{DIGEST}"),
                format!("registry.com/foo@{DIGEST}"),
            ],
        ),
        (
            "repo/foo",
            vec![
                "quay.io/repo/foo:latest".to_string(),
                "registry.com/repo/foo:latest".to_string(),
            ],
        ),
    ];

    for (input, expected) in cases {
        let resolved = resolver.resolve(input).unwrap();
        let values: Vec<String> = resolved.candidates.iter().map(|c| c.value.to_string()).collect();
        assert_eq!(values, expected, "{input}");

        for candidate in &resolved.candidates {
            assert!(candidate.recordable);
            resolver.record(candidate).unwrap();

            let again = resolver.resolve(input).unwrap();
            assert_eq!(again.candidates.len(), 1, "{input}");
            assert!(!again.candidates[0].recordable);
            assert_eq!(again.candidates[0].value, candidate.value);
            assert!(matches!(again.rationale, Rationale::Alias { .. }));

            resolver.remove_alias(candidate.short_name()).unwrap();
            assert!(matches!(
                resolver.remove_alias(candidate.short_name()),
                Err(ShortNameError::AliasNotFound { .. })
            ));
        }
    }
}

#[test]
fn test_recorded_alias_precedence() {
    let setup = Setup::new(r#"unqualified-search-registries = ["quay.io", "registry.com"]"#);
    let resolver = setup.resolver();

    let resolved = resolver.resolve("repo/image").unwrap();
    let first = &resolved.candidates[0];
    assert_eq!(first.value.to_string(), "quay.io/repo/image:latest");
    assert!(first.recordable);
    resolver.record(first).unwrap();

    let resolved = resolver.resolve("repo/image").unwrap();
    assert_eq!(resolved.candidates.len(), 1);
    assert_eq!(
        resolved.candidates[0].value.to_string(),
        "quay.io/repo/image:latest"
    );
    assert!(!resolved.candidates[0].recordable);

    // A fresh resolver reads the same user file.
    let resolved = setup.resolver().resolve("repo/image:v2").unwrap();
    assert_eq!(
        resolved.candidates[0].value.to_string(),
        "quay.io/repo/image:v2"
    );
}

#[test]
fn test_user_alias_overrides_config_alias() {
    let setup = Setup::new(ONE_REG);
    let ctx = setup.context();

    add_alias(&setup.cache, &ctx, "repo/image", "registry.com/other/image").unwrap();
    let resolved = resolve(&setup.cache, &ctx, "repo/image").unwrap();
    assert_eq!(
        resolved.candidates[0].value.to_string(),
        "registry.com/other/image:latest"
    );
    match &resolved.rationale {
        Rationale::Alias { origin } => assert!(origin.ends_with("short-name-aliases.conf")),
        other => panic!("unexpected rationale {other:?}"),
    }

    remove_alias(&setup.cache, &ctx, "repo/image").unwrap();
    let resolved = resolve(&setup.cache, &ctx, "repo/image").unwrap();
    assert_eq!(
        resolved.candidates[0].value.to_string(),
        "quay.io/repo/image:latest"
    );
}

#[test]
fn test_config_aliases_are_read_only() {
    let setup = Setup::new(TWO_REG);
    let ctx = setup.context();

    assert!(matches!(
        remove_alias(&setup.cache, &ctx, "repo/image"),
        Err(ShortNameError::NotUserOwned { .. })
    ));
    for _ in 0..2 {
        assert!(matches!(
            remove_alias(&setup.cache, &ctx, "does/not/exist"),
            Err(ShortNameError::AliasNotFound { .. })
        ));
    }
}

#[test]
fn test_dropin_tombstone_falls_back_to_search() {
    let setup = Setup::new(ONE_REG);
    let dropins = setup.dir.path().join("registries.conf.d");
    fs::create_dir_all(&dropins).unwrap();
    fs::write(dropins.join("10-tombstone.conf"), "[aliases]\n\"repo/image\" = \"\"\n").unwrap();

    let resolved = setup.resolver().resolve("repo/image").unwrap();
    assert_eq!(resolved.rationale, Rationale::Search);
    assert!(resolved.candidates[0].recordable);
}

#[test]
fn test_resolve_locally() {
    let setup = Setup::new(TWO_REG);
    let ctx = setup.context();
    let strings = |input: &str| -> Vec<String> {
        resolve_locally(&setup.cache, &ctx, input)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    };

    assert_eq!(
        strings("repo/image"),
        [
            "quay.io/repo/image:latest",
            "localhost/repo/image:latest",
            "quay.io/repo/image:latest",
            "registry.com/repo/image:latest",
        ]
    );
    assert_eq!(
        strings("foo"),
        ["localhost/foo:latest", "quay.io/foo:latest", "registry.com/foo:latest"]
    );
    assert_eq!(
        strings("foo:tag"),
        ["localhost/foo:tag", "quay.io/foo:tag", "registry.com/foo:tag"]
    );
    assert_eq!(
        strings(&format!("foo@{DIGEST}")),
        [
            format!("localhost/foo@{DIGEST}"),
            format!("quay.io/foo@{DIGEST}"),
            format!("registry.com/foo@{DIGEST}"),
        ]
    );
    assert_eq!(strings("localhost/foo"), ["localhost/foo:latest"]);
    assert_eq!(strings("localhost/foo:tag"), ["localhost/foo:tag"]);
}

#[test]
fn test_resolve_locally_ignores_mode() {
    let setup = Setup::new(TWO_REG);
    let ctx = setup.context().with_short_name_mode(ShortNameMode::Enforcing);
    assert_eq!(resolve_locally(&setup.cache, &ctx, "foo").unwrap().len(), 3);

    let setup = Setup::new("");
    let local = resolve_locally(&setup.cache, &setup.context(), "foo").unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].to_string(), "localhost/foo:latest");
}

#[test]
fn test_concurrent_alias_writers() {
    let setup = Setup::new(ONE_REG);
    let ctx = setup.context();

    std::thread::scope(|scope| {
        for i in 0..16 {
            let (cache, ctx) = (&setup.cache, &ctx);
            scope.spawn(move || {
                let (name, value) = (format!("img{i}"), format!("quay.io/ns/img{i}"));
                add_alias(cache, ctx, &name, &value).unwrap();
            });
        }
    });

    let aliases = setup.resolver().alias_store().aliases().unwrap();
    assert_eq!(aliases.len(), 16);
    for i in 0..16 {
        let resolved = resolve(&setup.cache, &ctx, &format!("img{i}")).unwrap();
        assert_eq!(
            resolved.candidates[0].value.to_string(),
            format!("quay.io/ns/img{i}:latest")
        );
    }

    std::thread::scope(|scope| {
        for i in 0..16 {
            let (cache, ctx) = (&setup.cache, &ctx);
            scope.spawn(move || remove_alias(cache, ctx, &format!("img{i}")).unwrap());
        }
    });
    assert!(setup.resolver().alias_store().aliases().unwrap().is_empty());
}
