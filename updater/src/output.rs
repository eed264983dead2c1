//! User-facing progress output.
//!
//! Progress lines go to stderr so the wrapped tool's stdout stays clean.
//! Writers are passed in explicitly so tests can capture them.

use std::fmt::Display;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Format the progress line shown before an update.
#[must_use]
pub fn updating_message(version: impl Display) -> String {
    format!("Updating client tools to v{version}...")
}

/// Format the error line shown when the update mechanism fails.
#[must_use]
pub fn failure_message(category: impl Display, error: impl Display) -> String {
    format!("toolup: client tools update failed ({category}): {error}")
}
