//! Shared utilities for CLI commands

use std::fmt;
use sw_migrate::ShardError;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) u8);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; main prints nothing for it
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// JSON form of a per-shard error
pub(crate) fn error_json(error: &ShardError) -> serde_json::Value {
    serde_json::json!({
        "code": error.code(),
        "message": error.to_string(),
        "retryable": error.is_retryable(),
        "detail": error,
    })
}

/// Print pretty JSON to stdout
pub(crate) fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
