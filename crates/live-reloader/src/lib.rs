//! live-reloader - static file server with automatic browser reload.
//!
//! Serves a directory over HTTP and pushes a `reload` Server-Sent Event to
//! every open page whenever something under that directory changes.
//!
//! # Architecture
//!
//! - [`dev`] - path resolution, responses, the reload registry, debouncing,
//!   file watching and the axum server
//! - [`commands`] - the serve command lifecycle
//! - [`cli`] - argument parsing
//! - [`error`] - error types with actionable messages
//! - [`logger`] - structured logging with tracing
//! - [`ui`] - human-facing status lines
//!
//! # Example
//!
//! ```rust,no_run
//! use live_reloader::dev::{build_router, AppState, ReceiverRegistry, SiteRoot};
//! use std::sync::Arc;
//!
//! # fn run() -> std::io::Result<()> {
//! let root = SiteRoot::new("public")?;
//! let registry = Arc::new(ReceiverRegistry::new());
//! let app = build_router(AppState::new(root, registry));
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result, ResultExt};
