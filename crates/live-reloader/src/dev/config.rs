//! Server configuration built from command-line arguments.

use crate::cli::ServeArgs;
use crate::dev::SiteRoot;
use crate::error::{CliError, Result, ResultExt};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct DevConfig {
    /// Directory being served (absolute, normalized)
    pub root: SiteRoot,

    /// Server socket address (IP + port)
    pub addr: SocketAddr,

    /// Quiet period before a burst of changes triggers a reload
    pub debounce: Duration,
}

impl DevConfig {
    /// Create DevConfig from CLI arguments.
    ///
    /// # Errors
    ///
    /// - [`CliError::FileNotFound`] if the root does not exist
    /// - [`CliError::InvalidArgument`] if the root is not a directory or the
    ///   host is not an IP address
    pub fn from_args(args: &ServeArgs) -> Result<Self> {
        let requested: PathBuf = match &args.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to determine the current directory")?,
        };

        let root = SiteRoot::new(&requested).with_path(&requested)?;
        if !root.path().is_dir() {
            return Err(CliError::InvalidArgument(format!(
                "{} is not a directory",
                requested.display()
            )));
        }

        let ip = parse_host(&args.host)?;

        Ok(Self {
            root,
            addr: SocketAddr::new(ip, args.port),
            debounce: Duration::from_millis(args.debounce_ms),
        })
    }

    /// Get the server URL as a string.
    ///
    /// Loopback and wildcard binds are shown as `localhost`.
    pub fn server_url(&self) -> String {
        let ip = self.addr.ip();
        if ip.is_loopback() || ip.is_unspecified() {
            format!("http://localhost:{}", self.addr.port())
        } else {
            format!("http://{}", self.addr)
        }
    }
}

fn parse_host(host: &str) -> Result<IpAddr> {
    if host.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    host.parse::<IpAddr>().map_err(|_| {
        CliError::InvalidArgument(format!(
            "'{}' is not an IP address (try 127.0.0.1 or 0.0.0.0)",
            host
        ))
    })
}
