//! Handler for `keel tree`.

use miette::Result;

use keel_core::dependency::ResolutionScope;
use keel_ops::ops_tree::{self, TreeOptions};
use keel_util::errors::KeelError;

pub fn exec(
    scope: &str,
    depth: Option<usize>,
    inverted: bool,
    why: Option<String>,
    conflicts: bool,
    packages: Vec<String>,
) -> Result<()> {
    let cwd = super::current_dir()?;
    let scope = ResolutionScope::parse(scope).ok_or_else(|| KeelError::Generic {
        message: format!("unknown scope `{scope}`; expected `main` or `test`"),
    })?;

    let output = ops_tree::tree(
        &cwd,
        &TreeOptions {
            packages,
            scope,
            depth,
            inverted,
            why,
            conflicts,
        },
    )?;
    print!("{output}");
    Ok(())
}
