use keel_util::fs::{ensure_dir, expand_home, find_ancestor_with, relative_files};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_find_ancestor_with_direct() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("Keel.toml"), "").unwrap();
    let result = find_ancestor_with(tmp.path(), "Keel.toml");
    assert_eq!(result, Some(tmp.path().to_path_buf()));
}

#[test]
fn test_find_ancestor_with_nested() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("Keel.toml"), "").unwrap();
    let nested = tmp.path().join("a").join("b").join("c");
    std::fs::create_dir_all(&nested).unwrap();
    let result = find_ancestor_with(&nested, "Keel.toml");
    assert_eq!(result, Some(tmp.path().to_path_buf()));
}

#[test]
fn test_find_ancestor_with_not_found() {
    let tmp = TempDir::new().unwrap();
    let result = find_ancestor_with(tmp.path(), "NonExistent.file");
    assert_eq!(result, None);
}

#[test]
fn test_ensure_dir_creates_nested() {
    let tmp = TempDir::new().unwrap();
    let deep = tmp.path().join("x").join("y").join("z");
    assert!(!deep.exists());
    ensure_dir(&deep).unwrap();
    assert!(deep.is_dir());
}

#[test]
fn test_relative_files_sorted_and_relative() {
    let tmp = TempDir::new().unwrap();
    let pkg = tmp.path().join("io/spine");
    std::fs::create_dir_all(&pkg).unwrap();
    std::fs::write(pkg.join("B.java"), "").unwrap();
    std::fs::write(pkg.join("A.java"), "").unwrap();
    std::fs::write(tmp.path().join("top.txt"), "").unwrap();

    let files = relative_files(tmp.path()).unwrap();
    assert_eq!(
        files,
        vec![
            PathBuf::from("io/spine/A.java"),
            PathBuf::from("io/spine/B.java"),
            PathBuf::from("top.txt"),
        ]
    );
}

#[test]
fn test_relative_files_missing_root_is_empty() {
    let tmp = TempDir::new().unwrap();
    let files = relative_files(&tmp.path().join("nope")).unwrap();
    assert!(files.is_empty());
}

#[test]
fn test_expand_home_leaves_plain_paths() {
    assert_eq!(expand_home("/opt/repo"), PathBuf::from("/opt/repo"));
    assert!(!expand_home("~/repo").starts_with("~"));
}
