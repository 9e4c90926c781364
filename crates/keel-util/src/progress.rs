use std::io::Write;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

/// Print a Cargo-style status line: `   Resolving 42 dependencies`
///
/// The label is right-aligned to 12 columns in bold green.
pub fn status(label: &str, message: &str) {
    print_status(Style::new().green().bold(), label, message);
}

/// Like [`status`] but bold cyan, for informational lines.
pub fn status_info(label: &str, message: &str) {
    print_status(Style::new().cyan().bold(), label, message);
}

/// Warning-style status line (bold yellow label).
pub fn status_warn(label: &str, message: &str) {
    print_status(Style::new().yellow().bold(), label, message);
}

/// Failure-style status line (bold red label).
pub fn status_error(label: &str, message: &str) {
    print_status(Style::new().red().bold(), label, message);
}

fn print_status(style: Style, label: &str, message: &str) {
    let _ = writeln!(std::io::stderr(), "{:>12} {message}", style.apply_to(label));
}

/// Animated spinner for indeterminate work such as uploads.
///
/// Finish it with [`ProgressBar::finish_and_clear`].
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
