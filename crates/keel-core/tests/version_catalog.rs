use keel_core::dependency::{Coordinate, DependencyRef, ResolutionScope};
use keel_core::manifest::Manifest;
use keel_core::rules::{ForceSet, ForcedRule, RuleScope};
use keel_core::version_catalog::VersionCatalog;

fn catalog() -> VersionCatalog {
    let m = Manifest::parse_toml(
        r#"
[catalog.versions]
grpc = "1.47.0"

[catalog.libraries]
grpc-core = { group = "io.grpc", artifact = "grpc-core", "version.ref" = "grpc" }
grpc-stub = { group = "io.grpc", artifact = "grpc-stub", "version.ref" = "grpc" }
guava = { group = "com.google.guava", artifact = "guava", version = "31.1-jre" }
protobuf = { group = "com.google.protobuf", artifact = "protobuf-java" }
broken = { group = "org.example", artifact = "broken", "version.ref" = "nope" }

[catalog.bundles]
grpc = ["grpc-core", "grpc-stub"]
bad = ["grpc-core", "broken"]
"#,
    )
    .unwrap();
    VersionCatalog::new(m.catalog.as_ref())
}

#[test]
fn alias_resolves_version_ref() {
    let r = catalog().library("grpc-core").unwrap();
    assert_eq!(r.to_string(), "io.grpc:grpc-core:1.47.0");
}

#[test]
fn alias_with_literal_version() {
    let r = catalog().library("guava").unwrap();
    assert_eq!(r.version.as_deref(), Some("31.1-jre"));
}

#[test]
fn missing_version_ref_is_unresolved() {
    let err = catalog().library("broken").unwrap_err().to_string();
    assert!(err.contains("Unresolved dependency"), "{err}");
    assert!(err.contains("nope"), "{err}");
}

#[test]
fn unknown_alias_is_unresolved() {
    assert!(catalog().library("does-not-exist").is_err());
}

#[test]
fn bundle_expands_in_order() {
    let refs = catalog().bundle("grpc").unwrap();
    let names: Vec<_> = refs.iter().map(|r| r.coordinate.artifact.as_str()).collect();
    assert_eq!(names, vec!["grpc-core", "grpc-stub"]);
    assert!(catalog().bundle("bad").is_err());
}

#[test]
fn resolve_prefers_explicit_version() {
    let r = DependencyRef::new("io.grpc", "grpc-core", Some("1.50.0"));
    let v = catalog()
        .resolve(&r, ResolutionScope::Main, &ForceSet::default())
        .unwrap();
    assert_eq!(v, "1.50.0");
}

#[test]
fn resolve_falls_back_to_catalog_coordinate() {
    let r = DependencyRef::new("io.grpc", "grpc-stub", None);
    let v = catalog()
        .resolve(&r, ResolutionScope::Main, &ForceSet::default())
        .unwrap();
    assert_eq!(v, "1.47.0");
}

#[test]
fn resolve_falls_back_to_forced_rule() {
    let forced = ForceSet::new(vec![ForcedRule {
        coordinate: Coordinate::new("com.google.protobuf", "protobuf-java"),
        version: "3.21.1".to_string(),
        scope: RuleScope::Main,
        origin: "Keel.toml".to_string(),
    }]);
    let r = DependencyRef::new("com.google.protobuf", "protobuf-java", None);
    assert_eq!(
        catalog().resolve(&r, ResolutionScope::Main, &forced).unwrap(),
        "3.21.1"
    );
    let err = catalog()
        .resolve(&r, ResolutionScope::Test, &forced)
        .unwrap_err()
        .to_string();
    assert!(err.contains("com.google.protobuf:protobuf-java"), "{err}");
}

#[test]
fn entries_are_sorted_by_alias() {
    let m = Manifest::parse_toml(
        r#"
[catalog.libraries]
b = { group = "g", artifact = "b", version = "2" }
a = { group = "g", artifact = "a", version = "1" }
"#,
    )
    .unwrap();
    let entries = VersionCatalog::new(m.catalog.as_ref()).entries().unwrap();
    assert_eq!(entries[0].alias, "a");
    assert_eq!(entries[1].version.as_deref(), Some("2"));
}
