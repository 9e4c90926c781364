//! Handler for `keel publish`.

use miette::Result;

use keel_maven::publish::PublishReport;
use keel_ops::ops_publish::{self, PublishOptions};
use keel_util::errors::KeelError;
use keel_util::progress::{status, status_error};

pub async fn exec(packages: Vec<String>, targets: Vec<String>, json: bool) -> Result<()> {
    let cwd = super::current_dir()?;
    let report = ops_publish::publish(&cwd, &PublishOptions { packages, targets }).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&report).map_err(|e| KeelError::Generic {
            message: format!("cannot render report: {e}"),
        })?;
        println!("{rendered}");
    } else {
        print_summary(&report);
    }
    report.into_result()
}

fn print_summary(report: &PublishReport) {
    for result in &report.results {
        match result.to_error() {
            None => status(
                "Published",
                &format!("{} to {} ({})", result.coordinate, result.target, result.location),
            ),
            Some(e) => status_error("Failed", &e.to_string()),
        }
    }
    if !report.results.is_empty() {
        status(
            "Finished",
            &format!("{} of {} publication(s) succeeded", report.succeeded(), report.results.len()),
        );
    }
}
