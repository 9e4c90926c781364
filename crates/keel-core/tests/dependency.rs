use keel_core::dependency::{Coordinate, DependencyRef, DependencyScope, ResolutionScope};

#[test]
fn parse_reference_with_version() {
    let r = DependencyRef::parse("io.grpc:grpc-core:1.47.0").unwrap();
    assert_eq!(r.coordinate, Coordinate::new("io.grpc", "grpc-core"));
    assert_eq!(r.version.as_deref(), Some("1.47.0"));
    assert_eq!(r.to_string(), "io.grpc:grpc-core:1.47.0");
}

#[test]
fn parse_reference_without_version() {
    let r = DependencyRef::parse("io.grpc:grpc-core").unwrap();
    assert!(r.version.is_none());
    assert_eq!(r.to_string(), "io.grpc:grpc-core");
}

#[test]
fn parse_rejects_malformed_references() {
    assert!(DependencyRef::parse("grpc-core").is_none());
    assert!(DependencyRef::parse("io.grpc::1.0").is_none());
    assert!(DependencyRef::parse("a:b:c:d").is_none());
    assert!(Coordinate::parse("a:b:c").is_none());
}

#[test]
fn test_scope_only_visible_in_test_resolution() {
    assert!(!DependencyScope::Test.visible_in(ResolutionScope::Main));
    assert!(DependencyScope::Test.visible_in(ResolutionScope::Test));
    assert!(DependencyScope::Provided.visible_in(ResolutionScope::Main));
    assert!(!DependencyScope::Provided.is_runtime());
    assert!(DependencyScope::Runtime.is_runtime());
}

#[test]
fn resolution_scope_parse_round_trips_names() {
    for scope in ResolutionScope::ALL {
        assert_eq!(ResolutionScope::parse(scope.as_str()), Some(scope));
    }
    assert_eq!(ResolutionScope::parse("compile"), None);
}
