//! User-facing output utilities for clean, colored terminal messages
//!
//! Messages go to stderr so stdout carries only matching paths.

use owo_colors::OwoColorize;

/// Display a warning message to the user in yellow with padding
///
/// # Example
/// ```ignore
/// output::warn("2 path(s) could not be tested against the pattern.");
/// ```
pub fn warn(message: &str) {
    eprintln!("\n{}\n", message.yellow());
}

/// Display an error message to the user in red with padding
///
/// # Example
/// ```ignore
/// output::error("Error: Invalid pattern '(': unclosed group");
/// ```
pub fn error(message: &str) {
    eprintln!("\n{}\n", message.red());
}
