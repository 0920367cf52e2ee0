//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::AddrInUse { port } => miette::miette!(
            help = format!(
                "Try using a different port: live-reloader --port {}",
                port.saturating_add(1)
            ),
            "Port {} is already in use.",
            port
        ),
        _ => miette::miette!("{}", err),
    }
}
