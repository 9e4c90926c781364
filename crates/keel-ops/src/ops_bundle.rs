//! Operation: merge a module jar and its runtime libraries into one
//! self-contained archive.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use keel_core::manifest::BundleConfig;
use keel_core::module::Module;
use keel_maven::repository::LocalRepository;
use keel_plan::builder::BuildPlan;
use keel_util::errors::KeelError;
use keel_util::progress::{status, status_warn};

use crate::ops_build::{self, BuildOptions};
use crate::BuildContext;

/// Options for `keel bundle`.
#[derive(Debug, Default, Clone)]
pub struct BundleOptions {
    pub packages: Vec<String>,
}

/// One written bundle.
#[derive(Debug, Clone)]
pub struct BundleOutcome {
    pub module: String,
    pub path: PathBuf,
    pub entries: usize,
    /// Jars merged, the module's own included.
    pub inputs: usize,
    /// Module or library jars that were not found.
    pub missing: Vec<String>,
}

/// Entry filters built from `[bundle]`.
pub struct BundleRules {
    exclude: GlobSet,
    merge: GlobSet,
}

impl BundleRules {
    pub fn from_config(config: Option<&BundleConfig>) -> miette::Result<Self> {
        let (exclude, merge) = match config {
            Some(c) => (c.exclude.as_slice(), c.merge_service_files.as_slice()),
            None => (&[][..], &[][..]),
        };
        Ok(Self {
            exclude: glob_set(exclude)?,
            merge: glob_set(merge)?,
        })
    }

    fn excludes(&self, entry: &str) -> bool {
        self.exclude.is_match(entry)
    }

    fn merges(&self, entry: &str) -> bool {
        self.merge.is_match(entry)
    }
}

fn glob_set(patterns: &[String]) -> miette::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| KeelError::Manifest {
            message: format!("invalid [bundle] pattern `{pattern}`: {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| {
        KeelError::Manifest {
            message: format!("invalid [bundle] patterns: {e}"),
        }
        .into()
    })
}

/// Bundle every selected module that applies `shadow`.
pub fn bundle(start_dir: &Path, opts: &BundleOptions) -> miette::Result<Vec<BundleOutcome>> {
    let result = ops_build::build(
        start_dir,
        &BuildOptions {
            packages: opts.packages.clone(),
            locked: false,
            quiet: true,
        },
    )?;

    let mut outcomes = Vec::new();
    for planned in result.plan.modules().iter().filter(|m| m.bundled) {
        let Some(module) = result.context.workspace.module(&planned.name) else {
            continue;
        };
        let outcome = bundle_module(&result.context, &result.plan, module)?;
        status(
            "Bundled",
            &format!(
                "{} ({} entries from {} jar(s)) -> {}",
                outcome.module,
                outcome.entries,
                outcome.inputs,
                outcome.path.display()
            ),
        );
        outcomes.push(outcome);
    }
    if outcomes.is_empty() {
        status_warn("Skipped", "no selected module applies `shadow`");
    }
    Ok(outcomes)
}

/// Write `module`'s bundle to [`Module::bundle_path`].
///
/// The module jar must already exist. Jars of modules it depends on and
/// its runtime libraries are merged after it; absent ones are reported
/// and skipped.
pub fn bundle_module(context: &BuildContext, plan: &BuildPlan, module: &Module) -> miette::Result<BundleOutcome> {
    let own = module.artifact_path();
    if !own.is_file() {
        return Err(KeelError::Generic {
            message: format!(
                "cannot bundle `{}`: module jar {} does not exist",
                module.name,
                own.display()
            ),
        }
        .into());
    }

    let mut inputs = vec![own];
    let mut missing = Vec::new();
    for name in project_closure(plan, &module.name) {
        if let Some(dep) = context.workspace.module(&name) {
            let jar = dep.artifact_path();
            if jar.is_file() {
                inputs.push(jar);
            } else {
                tracing::warn!("module jar {} not found; `{name}` left out of the bundle", jar.display());
                missing.push(name);
            }
        }
    }

    let local = LocalRepository::new(context.global.local_repository());
    for (coordinate, version) in plan.resolution().runtime_libraries(&module.name) {
        let jar = local.jar_path(&coordinate.group, &coordinate.artifact, &version);
        if jar.is_file() {
            inputs.push(jar);
        } else {
            tracing::warn!("{coordinate}:{version} is not in the local repository");
            missing.push(format!("{coordinate}:{version}"));
        }
    }

    let rules = BundleRules::from_config(module.manifest.bundle.as_ref())?;
    let output = module.bundle_path();
    let entries = merge_jars(&inputs, &output, &rules)?;
    Ok(BundleOutcome {
        module: module.name.clone(),
        path: output,
        entries,
        inputs: inputs.len(),
        missing,
    })
}

/// Modules `name` depends on, directly or not, in plan order.
fn project_closure(plan: &BuildPlan, name: &str) -> Vec<String> {
    let mut wanted = vec![name.to_string()];
    let mut i = 0;
    while i < wanted.len() {
        if let Some(m) = plan.module(&wanted[i]) {
            for dep in &m.depends_on {
                if !wanted.contains(dep) {
                    wanted.push(dep.clone());
                }
            }
        }
        i += 1;
    }
    plan.modules()
        .iter()
        .filter(|m| m.name != name && wanted.contains(&m.name))
        .map(|m| m.name.clone())
        .collect()
}

/// Merge `inputs` into a new archive at `output`, returning the entry count.
///
/// Earlier inputs win on duplicate names, except for entries matched by
/// the merge patterns, whose contents are concatenated line-wise.
pub fn merge_jars(inputs: &[PathBuf], output: &Path, rules: &BundleRules) -> miette::Result<usize> {
    let mut order: Vec<String> = Vec::new();
    let mut contents: HashMap<String, Vec<u8>> = HashMap::new();

    for input in inputs {
        let file = File::open(input).map_err(KeelError::Io)?;
        let mut archive = ZipArchive::new(file).map_err(|e| zip_error(input, e))?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| zip_error(input, e))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if rules.excludes(&name) {
                tracing::debug!("excluding {name} from {}", input.display());
                continue;
            }
            let merge = rules.merges(&name);
            if contents.contains_key(&name) && !merge {
                continue;
            }
            let mut data = Vec::new();
            entry.read_to_end(&mut data).map_err(KeelError::Io)?;
            match contents.get_mut(&name) {
                Some(existing) => {
                    if !existing.is_empty() && !existing.ends_with(b"\n") {
                        existing.push(b'\n');
                    }
                    existing.extend_from_slice(&data);
                }
                None => {
                    order.push(name.clone());
                    contents.insert(name, data);
                }
            }
        }
    }

    if let Some(parent) = output.parent() {
        keel_util::fs::ensure_dir(parent).map_err(KeelError::Io)?;
    }
    let file = File::create(output).map_err(KeelError::Io)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for name in &order {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| zip_error(output, e))?;
        if let Some(data) = contents.get(name) {
            writer.write_all(data).map_err(KeelError::Io)?;
        }
    }
    writer.finish().map_err(|e| zip_error(output, e))?;
    tracing::debug!("wrote {} entries to {}", order.len(), output.display());
    Ok(order.len())
}

fn zip_error(path: &Path, e: zip::result::ZipError) -> KeelError {
    KeelError::Generic {
        message: format!("{}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jar(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn read(path: &Path) -> HashMap<String, String> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut out = HashMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            out.insert(entry.name().to_string(), body);
        }
        out
    }

    fn rules(exclude: &[&str], merge: &[&str]) -> BundleRules {
        BundleRules::from_config(Some(&BundleConfig {
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            merge_service_files: merge.iter().map(|s| s.to_string()).collect(),
            artifact_id: None,
        }))
        .unwrap()
    }

    #[test]
    fn first_input_wins_on_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.jar");
        let b = tmp.path().join("b.jar");
        jar(&a, &[("io/X.class", "own"), ("META-INF/MANIFEST.MF", "a")]);
        jar(&b, &[("io/X.class", "lib"), ("org/Y.class", "y")]);
        let out = tmp.path().join("out/all.jar");

        let count = merge_jars(&[a, b], &out, &rules(&[], &[])).unwrap();
        assert_eq!(count, 3);
        let entries = read(&out);
        assert_eq!(entries["io/X.class"], "own");
        assert_eq!(entries["org/Y.class"], "y");
    }

    #[test]
    fn excluded_entries_are_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.jar");
        jar(&a, &[("io/X.class", "x"), ("META-INF/LIB.SF", "sig")]);
        let out = tmp.path().join("all.jar");

        merge_jars(&[a], &out, &rules(&["META-INF/*.SF"], &[])).unwrap();
        let entries = read(&out);
        assert!(entries.contains_key("io/X.class"));
        assert!(!entries.contains_key("META-INF/LIB.SF"));
    }

    #[test]
    fn service_files_are_concatenated() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.jar");
        let b = tmp.path().join("b.jar");
        jar(&a, &[("META-INF/services/io.Plugin", "io.A")]);
        jar(&b, &[("META-INF/services/io.Plugin", "io.B\n")]);
        let out = tmp.path().join("all.jar");

        merge_jars(&[a, b], &out, &rules(&[], &["META-INF/services/**"])).unwrap();
        assert_eq!(read(&out)["META-INF/services/io.Plugin"], "io.A\nio.B\n");
    }

    #[test]
    fn invalid_pattern_is_a_manifest_error() {
        let err = BundleRules::from_config(Some(&BundleConfig {
            exclude: vec!["[".into()],
            merge_service_files: Vec::new(),
            artifact_id: None,
        }))
        .err()
        .unwrap()
        .to_string();
        assert!(err.contains("invalid [bundle] pattern"), "{err}");
    }
}
