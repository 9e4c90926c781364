use std::fs;
use std::path::Path;

use keel_core::workspace::Workspace;
use keel_plan::builder::{build, BuildPlan};
use keel_resolver::metadata::InMemoryMetadata;
use keel_resolver::resolver::{resolve, ResolveInput};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn plan(root: &Path) -> miette::Result<BuildPlan> {
    let ws = Workspace::load(root)?;
    let selected = ws.select(&[])?;
    let metadata = InMemoryMetadata::new();
    let resolution = resolve(&ResolveInput {
        workspace: &ws,
        modules: selected.clone(),
        metadata: &metadata,
    })?;
    build(&ws, &selected, resolution)
}

fn model_tools(root: &Path) {
    write(
        &root.join("Keel.toml"),
        r#"
[workspace]
members = ["model-check", "model-assembler", "model"]
group = "io.spine.tools"
version = "2.0.0"
plugins = ["java", "kotlin", "protobuf", "mc-java"]

[publishing]
modules = ["model-check"]
"#,
    );
    write(&root.join("model/Keel.toml"), "[module]\n");
    write(
        &root.join("model-assembler/Keel.toml"),
        r#"
[module]
plugins = ["assemble-lookup"]

[dependencies]
model = { project = "model" }
"#,
    );
    write(
        &root.join("model-check/Keel.toml"),
        r#"
[module]
plugins = ["model-check", "shadow"]

[dependencies]
model = { project = "model" }
assembler = { project = "model-assembler" }

[bundle]
artifact-id = "spine-model-check-bundle"
"#,
    );
}

fn with_plugin_defs(root: &Path) {
    let manifest = fs::read_to_string(root.join("Keel.toml")).unwrap();
    write(
        &root.join("Keel.toml"),
        &format!(
            r#"{manifest}
[plugin-defs.assemble-lookup]
generated = ["generated/{{set}}/resources"]
requires = ["compileJava"]

[[plugin-defs.assemble-lookup.tasks]]
name = "assignLookup"
after = ["compileJava"]
before = ["classes"]
"#
        ),
    );
}

#[test]
fn modules_follow_project_dependencies() {
    let tmp = tempfile::tempdir().unwrap();
    model_tools(tmp.path());
    with_plugin_defs(tmp.path());
    let plan = plan(tmp.path()).unwrap();
    let names: Vec<&str> = plan.modules().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["model", "model-assembler", "model-check"]);
}

#[test]
fn plugin_steps_shape_tasks_and_sources() {
    let tmp = tempfile::tempdir().unwrap();
    model_tools(tmp.path());
    with_plugin_defs(tmp.path());
    let plan = plan(tmp.path()).unwrap();

    let check = plan.module("model-check").unwrap();
    assert_eq!(
        check.applied,
        vec!["java", "kotlin", "protobuf", "mc-java", "model-check", "shadow"]
    );
    assert!(check.publishable);
    assert!(check.bundled);

    let tasks = check.task_names();
    let pos = |t: &str| tasks.iter().position(|n| *n == t).unwrap();
    assert!(pos("generateProto") < pos("generateRejections"));
    assert!(pos("generateRejections") < pos("compileKotlin"));
    assert!(pos("compileKotlin") < pos("compileJava"));
    assert!(pos("compileJava") < pos("checkModel"));
    assert!(pos("checkModel") < pos("classes"));
    assert!(pos("jar") < pos("shadowJar"));

    let main: Vec<String> = check
        .source_path("main")
        .iter()
        .map(|p| p.strip_prefix(&check.dir).unwrap().display().to_string())
        .collect();
    assert_eq!(
        main,
        vec![
            "src/main/java",
            "src/main/kotlin",
            "generated/main/java",
            "generated/main/grpc",
            "generated/main/spine",
        ]
    );

    let assembler = plan.module("model-assembler").unwrap();
    assert!(!assembler.publishable);
    let tasks = assembler.task_names();
    let pos = |t: &str| tasks.iter().position(|n| *n == t).unwrap();
    assert!(pos("compileJava") < pos("assignLookup"));
    assert!(pos("assignLookup") < pos("classes"));
    assert!(assembler
        .source_path("test")
        .iter()
        .any(|p| p.ends_with("generated/test/resources")));
}

#[test]
fn plugin_without_required_task_is_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        &tmp.path().join("Keel.toml"),
        r#"
[module]
name = "lonely"
group = "org.acme"
version = "1.0"
plugins = ["model-check", "java"]
"#,
    );
    let plan = plan(tmp.path()).unwrap();
    let module = plan.module("lonely").unwrap();
    assert_eq!(module.skipped, vec!["model-check"]);
    assert!(!module.task_names().contains(&"checkModel"));
}

#[test]
fn unknown_plugin_fails() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        &tmp.path().join("Keel.toml"),
        r#"
[module]
name = "odd"
group = "org.acme"
version = "1.0"
plugins = ["java", "errorprone"]
"#,
    );
    let err = plan(tmp.path()).err().unwrap().to_string();
    assert!(err.contains("unknown plugin `errorprone`"), "{err}");
}

#[test]
fn generated_file_shadowing_authored_one_fails() {
    let tmp = tempfile::tempdir().unwrap();
    model_tools(tmp.path());
    with_plugin_defs(tmp.path());
    write(&tmp.path().join("model/src/main/java/io/spine/X.java"), "class X {}");
    write(&tmp.path().join("model/generated/main/java/io/spine/X.java"), "class X {}");
    let err = plan(tmp.path()).err().unwrap().to_string();
    assert!(err.contains("Source overlap in module `model`"), "{err}");
    assert!(err.contains("X.java"), "{err}");
}

#[test]
fn custom_task_cycle_fails() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        &tmp.path().join("Keel.toml"),
        r#"
[module]
name = "loop"
group = "org.acme"
version = "1.0"
plugins = ["java", "looper"]

[plugin-defs.looper]
[[plugin-defs.looper.tasks]]
name = "weave"
after = ["jar"]
before = ["classes"]
"#,
    );
    let err = plan(tmp.path()).err().unwrap().to_string();
    assert!(err.contains("cycle"), "{err}");
}
