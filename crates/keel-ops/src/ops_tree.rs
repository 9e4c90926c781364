//! Operation: display the reconciled dependency tree.

use std::path::Path;

use keel_core::dependency::ResolutionScope;

use crate::ops_build::{self, BuildOptions};

/// Options for `keel tree`.
#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub packages: Vec<String>,
    pub scope: ResolutionScope,
    /// Maximum tree depth to display.
    pub depth: Option<usize>,
    /// Show dependents instead of dependencies; with `why`, only those
    /// of that library.
    pub inverted: bool,
    /// Show the path from a module to this library.
    pub why: Option<String>,
    /// Show only version decisions that changed something.
    pub conflicts: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            scope: ResolutionScope::Main,
            depth: None,
            inverted: false,
            why: None,
            conflicts: false,
        }
    }
}

/// Render the tree for the workspace containing `start_dir`.
pub fn tree(start_dir: &Path, opts: &TreeOptions) -> miette::Result<String> {
    let result = ops_build::build(
        start_dir,
        &BuildOptions {
            packages: opts.packages.clone(),
            locked: false,
            quiet: true,
        },
    )?;
    let Some(reconciled) = result.plan.resolution().scope(opts.scope) else {
        return Ok(String::new());
    };
    let graph = &reconciled.graph;

    if let Some(target) = &opts.why {
        if opts.inverted {
            let inverted = graph.print_inverted_tree(target);
            if !inverted.is_empty() {
                return Ok(inverted);
            }
        }
        return Ok(match graph.find_path(target) {
            Some(path) => {
                let mut out = format!("Path to {target}:\n");
                for (i, node) in path.iter().enumerate() {
                    out.push_str(&format!("{}{node}\n", "  ".repeat(i)));
                }
                out
            }
            None => format!("Dependency '{target}' not found in the {} scope.\n", opts.scope),
        });
    }

    if opts.conflicts {
        return Ok(format!("{}\n", reconciled.report.to_string().trim_end()));
    }

    if opts.inverted {
        let inverted = graph.print_full_inverted_tree();
        return Ok(if inverted.is_empty() {
            "No dependencies.\n".to_string()
        } else {
            inverted
        });
    }

    Ok(graph.print_tree(opts.depth))
}
