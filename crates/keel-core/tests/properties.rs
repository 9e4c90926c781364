use keel_core::properties::{interpolate, load_env_file};
use std::collections::BTreeMap;

#[test]
fn load_env_file_skips_comments_and_blank_lines() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join(".keel.env");
    std::fs::write(
        &path,
        "# credentials\n\nCLOUD_REPO_USER=ci\nexport CLOUD_REPO_PASS=\"p4ss\"\n",
    )
    .unwrap();
    let vars = load_env_file(&path).unwrap();
    assert_eq!(vars.len(), 2);
    assert_eq!(vars["CLOUD_REPO_USER"], "ci");
    assert_eq!(vars["CLOUD_REPO_PASS"], "p4ss");
}

#[test]
fn load_env_file_missing_is_empty() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(load_env_file(&tmp.path().join(".keel.env")).unwrap().is_empty());
}

#[test]
fn interpolate_prefers_overrides() {
    let mut vars = BTreeMap::new();
    vars.insert("KEEL_TEST_TOKEN".to_string(), "from-file".to_string());
    assert_eq!(
        interpolate("token = \"${env:KEEL_TEST_TOKEN}\"", &vars),
        "token = \"from-file\""
    );
}

#[test]
fn interpolate_uses_fallback_for_unset_variables() {
    let vars = BTreeMap::new();
    assert_eq!(
        interpolate("${env:KEEL_SURELY_UNSET_VAR:-https://repo.example}", &vars),
        "https://repo.example"
    );
    assert_eq!(interpolate("[${env:KEEL_SURELY_UNSET_VAR}]", &vars), "[]");
}

#[test]
fn interpolate_leaves_unterminated_reference() {
    let vars = BTreeMap::new();
    assert_eq!(interpolate("a ${env:OOPS", &vars), "a ${env:OOPS");
}
