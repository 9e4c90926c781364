use keel_core::dependency::ResolutionScope;
use keel_core::lockfile::{LockedDependencyRef, LockedPackage, Lockfile};

fn package(scope: ResolutionScope, group: &str, name: &str, version: &str) -> LockedPackage {
    LockedPackage {
        name: name.to_string(),
        group: group.to_string(),
        version: version.to_string(),
        scope,
        forced: false,
        dependencies: vec![],
    }
}

#[test]
fn generate_sorts_by_scope_then_coordinate() {
    let lock = Lockfile::generate(vec![
        package(ResolutionScope::Test, "junit", "junit", "4.13"),
        package(ResolutionScope::Main, "io.grpc", "grpc-core", "1.47.0"),
        package(ResolutionScope::Main, "com.google.guava", "guava", "32.0"),
    ]);
    let names: Vec<&str> = lock.package.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["guava", "grpc-core", "junit"]);
}

#[test]
fn write_then_read_preserves_packages() {
    let mut guava = package(ResolutionScope::Main, "com.google.guava", "guava", "32.0");
    guava.forced = true;
    guava.dependencies.push(LockedDependencyRef {
        name: "failureaccess".to_string(),
        group: "com.google.guava".to_string(),
        version: "1.0.1".to_string(),
    });
    let lock = Lockfile::generate(vec![guava]);

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("Keel.lock");
    lock.write_to(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("# This file is generated by keel"));
    let read = Lockfile::from_path(&path).unwrap();
    assert_eq!(read, lock);
    assert_eq!(
        read.locked_version(ResolutionScope::Main, "com.google.guava", "guava"),
        Some("32.0")
    );
    assert_eq!(
        read.locked_version(ResolutionScope::Test, "com.google.guava", "guava"),
        None
    );
}

#[test]
fn unforced_packages_omit_the_flag() {
    let lock = Lockfile::generate(vec![package(ResolutionScope::Main, "g", "a", "1")]);
    let text = lock.to_string_pretty().unwrap();
    assert!(!text.contains("forced"));
    assert!(text.contains("scope = \"main\""));
}

#[test]
fn empty_lockfile_round_trips() {
    let lock = Lockfile::default();
    let text = lock.to_string_pretty().unwrap();
    let parsed: Lockfile = toml::from_str(&text).unwrap();
    assert!(parsed.package.is_empty());
}
