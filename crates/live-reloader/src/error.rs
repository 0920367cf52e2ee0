//! Error handling for the live-reloader CLI.
//!
//! Startup and lifecycle failures are modelled with `thiserror` so that every
//! variant carries an actionable message. Request-level outcomes (bad paths,
//! escapes, missing files) are not errors of the process and live in
//! [`crate::dev::Rejection`] instead.
//!
//! # Example
//!
//! ```rust,no_run
//! use live_reloader::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_root(path: &Path) -> Result<std::path::PathBuf> {
//!     std::fs::canonicalize(path).with_path(path)
//! }
//! ```

mod report;

use std::path::PathBuf;
use thiserror::Error;

pub use self::report::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested port is already bound by another process
    #[error("Port {port} is already in use.\n\nHint: Try using a different port: live-reloader --port {}", .port.saturating_add(1))]
    AddrInUse {
        /// Port that could not be bound
        port: u16,
    },

    /// Server startup or runtime errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

impl CliError {
    /// Classify a bind failure, keeping "address in use" apart from the rest.
    pub fn bind(addr: std::net::SocketAddr, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::AddrInUse {
            CliError::AddrInUse { port: addr.port() }
        } else {
            CliError::Server(format!("Failed to bind to {}: {}", addr, err))
        }
    }
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn `NotFound` I/O errors into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Prefix the error with a custom message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
