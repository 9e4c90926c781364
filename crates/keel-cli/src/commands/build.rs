//! Handler for `keel build`.

use miette::Result;

use keel_ops::ops_build::{self, BuildOptions};

pub fn exec(packages: Vec<String>, locked: bool) -> Result<()> {
    let cwd = super::current_dir()?;
    ops_build::build(
        &cwd,
        &BuildOptions {
            packages,
            locked,
            quiet: false,
        },
    )?;
    Ok(())
}
