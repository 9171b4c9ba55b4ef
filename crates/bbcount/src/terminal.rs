//! Styled diagnostics on stderr.
//!
//! Labels are colored only when stderr is a terminal, so captured output
//! stays plain text.

use std::fmt::Display;
use std::path::Path;

use console::style;

/// Print `error: <message>`.
pub fn error(message: impl Display) {
    eprintln!("{} {message}", style("error:").red().bold().for_stderr());
}

/// Print `caution: <message>`.
pub fn caution(message: impl Display) {
    eprintln!("{} {message}", style("caution:").yellow().bold().for_stderr());
}

/// Print a diagnostic tied to an input file.
pub fn diagnostic(path: &Path, message: impl Display) {
    eprintln!("{}: {message}", style(path.display()).bold().for_stderr());
}
