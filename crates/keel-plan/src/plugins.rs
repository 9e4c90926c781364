//! Plugins as explicit transformation steps.
//!
//! A step never mutates shared state; it only describes what it adds to a
//! module: generated source roots, tasks with ordering constraints, and
//! publication flags. The builder applies the steps in declaration order.

use std::collections::BTreeMap;

use keel_core::manifest::PluginDef;
use keel_util::errors::KeelError;

/// Built-in plugin identifiers.
pub const BUILTIN_PLUGINS: [&str; 7] = [
    "java",
    "kotlin",
    "protobuf",
    "mc-java",
    "model-check",
    "maven-publish",
    "shadow",
];

/// A task a plugin registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTemplate {
    pub name: String,
    /// Tasks that must run first, when present.
    pub after: Vec<String>,
    /// Tasks that must run later, when present.
    pub before: Vec<String>,
}

impl TaskTemplate {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            after: Vec::new(),
            before: Vec::new(),
        }
    }

    fn after(mut self, task: impl Into<String>) -> Self {
        self.after.push(task.into());
        self
    }

    fn before(mut self, task: impl Into<String>) -> Self {
        self.before.push(task.into());
        self
    }
}

/// What applying one plugin does to a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginStep {
    pub id: String,
    /// Generated roots, relative to the module; `{set}` expands to every
    /// source set name.
    pub generated: Vec<String>,
    pub tasks: Vec<TaskTemplate>,
    /// Tasks that must already be registered, or the step is skipped.
    pub requires: Vec<String>,
    pub publishable: bool,
    pub bundled: bool,
}

impl PluginStep {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            generated: Vec::new(),
            tasks: Vec::new(),
            requires: Vec::new(),
            publishable: false,
            bundled: false,
        }
    }

    fn from_def(id: &str, def: &PluginDef) -> Self {
        Self {
            id: id.to_string(),
            generated: def.generated.clone(),
            tasks: def
                .tasks
                .iter()
                .map(|t| TaskTemplate {
                    name: t.name.clone(),
                    after: t.after.clone(),
                    before: t.before.clone(),
                })
                .collect(),
            requires: def.requires.clone(),
            publishable: def.publishable,
            bundled: false,
        }
    }

    /// Generated roots of source set `set`. Roots without `{set}` belong
    /// to `main`.
    pub fn generated_for(&self, set: &str) -> Vec<String> {
        self.generated
            .iter()
            .filter(|g| g.contains("{set}") || set == "main")
            .map(|g| g.replace("{set}", set))
            .collect()
    }
}

/// Name of a per-source-set task: `compileJava` for `main`,
/// `compileTestJava` for `test`.
pub fn set_task(set: &str, verb: &str, noun: &str) -> String {
    if set == "main" {
        format!("{verb}{noun}")
    } else {
        format!("{verb}{}{noun}", capitalize(set))
    }
}

/// `classes` for `main`, `testClasses` for `test`.
pub fn classes_task(set: &str) -> String {
    if set == "main" {
        "classes".to_string()
    } else {
        format!("{set}Classes")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn builtin(id: &str, sets: &[&str]) -> Option<PluginStep> {
    let mut step = PluginStep::new(id);
    match id {
        "java" => {
            for &set in sets {
                let compile = set_task(set, "compile", "Java");
                let classes = classes_task(set);
                step.tasks.push(TaskTemplate::new(&compile));
                step.tasks.push(TaskTemplate::new(&classes).after(&compile));
                if set != "main" {
                    step.tasks
                        .push(TaskTemplate::new(set).after(&classes).after("classes"));
                }
            }
            step.tasks.push(TaskTemplate::new("jar").after("classes"));
        }
        "kotlin" => {
            step.requires.push("compileJava".into());
            for &set in sets {
                step.tasks.push(
                    TaskTemplate::new(set_task(set, "compile", "Kotlin"))
                        .before(set_task(set, "compile", "Java"))
                        .before(classes_task(set)),
                );
            }
        }
        "protobuf" => {
            step.requires.push("compileJava".into());
            step.generated = vec!["generated/{set}/java".into(), "generated/{set}/grpc".into()];
            for &set in sets {
                step.tasks.push(
                    TaskTemplate::new(set_task(set, "generate", "Proto"))
                        .before(set_task(set, "compile", "Java"))
                        .before(set_task(set, "compile", "Kotlin")),
                );
            }
        }
        "mc-java" => {
            step.requires.push("generateProto".into());
            step.generated = vec!["generated/{set}/spine".into()];
            for &set in sets {
                step.tasks.push(
                    TaskTemplate::new(set_task(set, "generate", "Rejections"))
                        .after(set_task(set, "generate", "Proto"))
                        .before(set_task(set, "compile", "Java"))
                        .before(set_task(set, "compile", "Kotlin")),
                );
            }
        }
        "model-check" => {
            step.requires.push("classes".into());
            step.tasks.push(
                TaskTemplate::new("checkModel")
                    .after("compileJava")
                    .before("classes"),
            );
        }
        "maven-publish" => {
            step.requires.push("jar".into());
            step.publishable = true;
            step.tasks.push(
                TaskTemplate::new("publish")
                    .after("jar")
                    .after("shadowJar"),
            );
        }
        "shadow" => {
            step.requires.push("jar".into());
            step.bundled = true;
            step.tasks.push(
                TaskTemplate::new("shadowJar")
                    .after("jar")
                    .before("publish"),
            );
        }
        _ => return None,
    }
    Some(step)
}

/// Resolves plugin identifiers to steps.
pub struct PluginRegistry<'a> {
    custom: &'a BTreeMap<String, PluginDef>,
}

impl<'a> PluginRegistry<'a> {
    /// A registry that knows the built-ins plus `[plugin-defs]`.
    pub fn new(custom: &'a BTreeMap<String, PluginDef>) -> Self {
        Self { custom }
    }

    /// The step for `id` on a module with the given source sets.
    /// Workspace definitions take precedence over built-ins.
    pub fn step(&self, id: &str, sets: &[&str], module: &str) -> miette::Result<PluginStep> {
        if let Some(def) = self.custom.get(id) {
            return Ok(PluginStep::from_def(id, def));
        }
        builtin(id, sets).ok_or_else(|| {
            KeelError::Plan {
                message: format!(
                    "module `{module}` applies unknown plugin `{id}`; built-ins are {} and custom plugins go under [plugin-defs]",
                    BUILTIN_PLUGINS.join(", ")
                ),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::manifest::TaskDef;

    #[test]
    fn task_names_follow_source_sets() {
        assert_eq!(set_task("main", "compile", "Java"), "compileJava");
        assert_eq!(set_task("test", "compile", "Java"), "compileTestJava");
        assert_eq!(set_task("test", "generate", "Proto"), "generateTestProto");
        assert_eq!(classes_task("main"), "classes");
        assert_eq!(classes_task("test"), "testClasses");
    }

    #[test]
    fn java_registers_per_set_tasks() {
        let step = builtin("java", &["main", "test"]).unwrap();
        let names: Vec<&str> = step.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["compileJava", "classes", "compileTestJava", "testClasses", "test", "jar"]
        );
    }

    #[test]
    fn protobuf_generates_per_set() {
        let step = builtin("protobuf", &["main", "test"]).unwrap();
        assert_eq!(
            step.generated_for("test"),
            vec!["generated/test/java", "generated/test/grpc"]
        );
    }

    #[test]
    fn unknown_plugin_is_an_error() {
        let defs = BTreeMap::new();
        let err = PluginRegistry::new(&defs)
            .step("errorprone", &["main"], "core")
            .unwrap_err()
            .to_string();
        assert!(err.contains("unknown plugin `errorprone`"), "{err}");
    }

    #[test]
    fn custom_definitions_are_steps() {
        let mut defs = BTreeMap::new();
        defs.insert(
            "assemble-model".to_string(),
            PluginDef {
                generated: vec!["generated/{set}/model".into(), "build/model".into()],
                tasks: vec![TaskDef {
                    name: "assignLookup".into(),
                    after: vec!["compileJava".into()],
                    before: vec!["classes".into()],
                }],
                requires: vec!["compileJava".into()],
                publishable: false,
            },
        );
        let step = PluginRegistry::new(&defs)
            .step("assemble-model", &["main"], "core")
            .unwrap();
        assert_eq!(step.tasks[0].name, "assignLookup");
        assert_eq!(step.generated_for("main"), vec!["generated/main/model", "build/model"]);
        assert_eq!(step.generated_for("test"), vec!["generated/test/model"]);
    }
}
