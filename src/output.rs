//! Colored output and progress reporting.
//!
//! Uses owo-colors for terminal colors and indicatif for progress bars.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Print an action with task counter (cyan counter)
/// Example: "(2/5) fossil:extract"
pub fn action_numbered(current: usize, total: usize, message: &str) {
    println!(
        "{} {}",
        format!("({}/{})", current, total).cyan(),
        message.bold()
    );
}

/// Print a detail line (dimmed)
/// Example: "     downloaded pikchr.tar.gz (51234 bytes)"
pub fn detail(message: &str) {
    println!("     {}", message.dimmed());
}

/// Print a success message (green)
pub fn success(message: &str) {
    println!("{} {}", "==>".green().bold(), message.green());
}

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

/// Print an error message (red)
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message.red());
}

/// Print a skip message (dimmed)
/// Example: "==> examples:fetch up to date, skipping"
pub fn skip(message: &str) {
    println!("{} {}", "==>".dimmed(), message.dimmed());
}

/// Create a simple spinner for operations of unknown length
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("     {spinner:.cyan} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Upgrade a spinner to a byte progress bar once the total is known
pub fn upgrade_to_bytes(pb: &ProgressBar, total: u64) {
    pb.set_length(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("     {spinner:.cyan} [{bar:30.cyan/dim}] {bytes}/{total_bytes} ({eta})")
            .unwrap()
            .progress_chars("━╸━"),
    );
}
