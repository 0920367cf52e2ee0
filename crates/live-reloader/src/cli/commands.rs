use clap::Args;
use std::path::PathBuf;

/// Arguments for serving a directory
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Directory to serve
    ///
    /// Every served file must live inside this directory. Defaults to the
    /// current working directory.
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Port for the HTTP server
    ///
    /// Startup fails if the port is already in use; pick another one with
    /// --port.
    #[arg(
        short,
        long,
        default_value = "3000",
        value_name = "PORT",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub port: u16,

    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1", value_name = "HOST")]
    pub host: String,

    /// Quiet period in milliseconds before a burst of file changes triggers a reload
    #[arg(long = "debounce", default_value = "75", value_name = "MS")]
    pub debounce_ms: u64,
}
