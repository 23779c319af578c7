//! Gateway SQL schema.

use std::io::Write;

/// Tables, row-level security policies and triggers the storefront expects.
pub const SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Write the schema to stdout.
///
/// # Errors
///
/// Returns an error if stdout is closed.
pub fn print() -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(SCHEMA.as_bytes())?;
    stdout.flush()
}
