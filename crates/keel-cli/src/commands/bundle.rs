//! Handler for `keel bundle`.

use miette::Result;

use keel_ops::ops_bundle::{self, BundleOptions};
use keel_util::progress::status_warn;

pub fn exec(packages: Vec<String>) -> Result<()> {
    let cwd = super::current_dir()?;
    for outcome in ops_bundle::bundle(&cwd, &BundleOptions { packages })? {
        for missing in &outcome.missing {
            status_warn("Missing", &format!("{missing} (left out of {})", outcome.module));
        }
    }
    Ok(())
}
