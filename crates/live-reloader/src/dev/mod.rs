//! Development server module.
//!
//! - [`resolve`]: request path to file, confined to the served root
//! - [`respond`]: file to HTTP response, with reload-client injection for HTML
//! - [`registry`]: the set of open reload streams
//! - [`debounce`]: collapses bursts of file changes into one reload
//! - [`watcher`]: recursive file system notifications
//! - [`server`]: axum router tying it together

pub mod config;
pub mod debounce;
pub mod registry;
pub mod resolve;
pub mod respond;
pub mod server;
pub mod watcher;

// Re-exports
pub use config::DevConfig;
pub use debounce::{DebounceHandle, DEFAULT_WINDOW, RELOAD_PAYLOAD};
pub use registry::{Receiver, ReceiverId, ReceiverRegistry, Registration};
pub use resolve::{resolve, Rejection, Resolved, ResolvedFile, SiteRoot, INDEX_PATH};
pub use respond::{inject_reload_script, redirect_to_root, respond, ContentType, RELOAD_SNIPPET};
pub use server::{build_router, AppState, DevServer};
pub use watcher::{ChangeKind, FileChange, FileWatcher};

/// Endpoint serving the reload event stream.
pub const RELOAD_PATH: &str = "/__reload";
