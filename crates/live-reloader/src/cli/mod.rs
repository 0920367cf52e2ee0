//! Command-line interface definition for live-reloader.
//!
//! A single command: serve a directory and reload connected pages when
//! anything under it changes.
//!
//! ```text
//! live-reloader [ROOT] [--port <PORT>] [--host <HOST>] [--debounce <MS>]
//! ```

mod commands;

use clap::Parser;

pub use commands::ServeArgs;

/// live-reloader - static file server with automatic browser reload
#[derive(Parser, Debug)]
#[command(
    name = "live-reloader",
    version,
    about = "Serve a directory and reload the browser when files change",
    long_about = "live-reloader serves static files from a directory over HTTP and pushes a\n\
                  reload event to every open page whenever a file under that directory\n\
                  changes. HTML pages get a tiny reload client injected on the fly."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub serve: ServeArgs,
}
