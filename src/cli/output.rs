//! Output formatting and progress indicators
//!
//! Results go to stdout. Status lines and progress go to stderr so results can be piped.

use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

static QUIET: AtomicBool = AtomicBool::new(false);
static JSON: AtomicBool = AtomicBool::new(false);

/// Global output mode from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub quiet: bool,
    pub json: bool,
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self { quiet, json, verbose }
    }

    /// Make this configuration visible to `is_quiet`/`is_json`
    pub fn apply_global(self) {
        QUIET.store(self.quiet, Ordering::Relaxed);
        JSON.store(self.json, Ordering::Relaxed);
    }

    /// Log level directive for the tracing subscriber
    pub fn log_level(self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn is_json() -> bool {
    JSON.load(Ordering::Relaxed)
}

/// Create a progress bar over orchestrated solutions, hidden in quiet and JSON modes
pub fn create_build_bar(total: u64) -> ProgressBar {
    if is_quiet() || is_json() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} solutions ({msg})")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░"),
    );
    pb
}

pub fn print_success(message: &str) {
    if !is_quiet() && !is_json() {
        eprintln!("{} {message}", status::SUCCESS);
    }
}

pub fn print_info(message: &str) {
    if !is_quiet() && !is_json() {
        eprintln!("{} {message}", status::INFO);
    }
}

pub fn print_warning(message: &str) {
    if !is_quiet() && !is_json() {
        eprintln!("{} {message}", status::WARNING);
    }
}

/// Indented follow-up line
pub fn print_detail(message: &str) {
    if !is_quiet() && !is_json() {
        eprintln!("    {message}");
    }
}

/// Print an error and its causes
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("    Caused by: {cause}");
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_verbosity() {
        assert_eq!(OutputConfig::new(false, false, 0).log_level(), tracing::Level::WARN);
        assert_eq!(OutputConfig::new(false, false, 1).log_level(), tracing::Level::INFO);
        assert_eq!(OutputConfig::new(false, false, 2).log_level(), tracing::Level::DEBUG);
        assert_eq!(OutputConfig::new(false, false, 7).log_level(), tracing::Level::TRACE);
        assert_eq!(OutputConfig::new(true, false, 3).log_level(), tracing::Level::ERROR);
    }
}
