use keel_util::hash::{sha256_bytes, Digests};

#[test]
fn test_sha256_of_nothing() {
    assert_eq!(
        sha256_bytes(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn test_sha256_matches_digests() {
    let jar = b"PK\x03\x04 pretend jar";
    assert_eq!(sha256_bytes(jar), Digests::of(jar).sha256);
}

#[test]
fn test_digests_known_values() {
    let d = Digests::of(b"hello world");
    assert_eq!(d.md5, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    assert_eq!(d.sha1, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
    assert_eq!(
        d.sha256,
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );
}

#[test]
fn test_sidecars_are_written_weakest_first() {
    let d = Digests::of(b"");
    let exts: Vec<&str> = d.sidecars().iter().map(|(ext, _)| *ext).collect();
    assert_eq!(exts, vec!["md5", "sha1", "sha256"]);
}
