//! Serve command implementation.
//!
//! Orchestrates the server lifecycle:
//! - Validate configuration and bind the port
//! - Start the file watcher and the reload debouncer
//! - Run the HTTP server in the background
//! - Forward file changes to the debouncer until Ctrl+C

use crate::cli::ServeArgs;
use crate::dev::{
    debounce, server, AppState, DebounceHandle, DevConfig, DevServer, FileChange, FileWatcher,
    ReceiverRegistry,
};
use crate::error::{CliError, Result};
use crate::ui;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{mpsc, oneshot};

/// How long open connections get to finish after shutdown begins.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Outcome of starting the watcher: the watcher and its change feed.
pub type WatchSetup = Result<(FileWatcher, mpsc::Receiver<FileChange>)>;

/// Execute the serve command.
///
/// # Errors
///
/// Returns errors for an invalid root or host, a port that cannot be bound
/// (with "already in use" reported separately), and server failures. Watcher
/// problems are logged and never returned.
pub async fn execute(args: ServeArgs) -> Result<()> {
    let config = DevConfig::from_args(&args)?;
    let listener = server::bind(config.addr).await?;

    ui::success(&format!(
        "Serving \"{}\" at {}",
        config.root.path().display(),
        config.server_url()
    ));

    let watch = FileWatcher::new(config.root.path().to_path_buf());
    let registry = Arc::new(ReceiverRegistry::new());

    ui::info("Press Ctrl+C to stop");

    run(config, listener, watch, registry, async {
        let _ = signal::ctrl_c().await;
        ui::info("Shutting down...");
    })
    .await?;

    ui::success("Server stopped");
    Ok(())
}

/// Serve `config.root` on `listener` until `shutdown` resolves.
///
/// Changes from `watch` restart the debounce window; each quiet window ends
/// in one reload broadcast over `registry`. A failed `watch` only disables
/// reloads, files are still served.
///
/// # Errors
///
/// Returns [`CliError::Server`] if the server task fails.
pub async fn run(
    config: DevConfig,
    listener: TcpListener,
    watch: WatchSetup,
    registry: Arc<ReceiverRegistry>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let (debouncer, _debounce_task) = debounce::spawn(config.debounce, Arc::clone(&registry));

    let (watcher, mut change_rx) = match watch {
        Ok((watcher, rx)) => {
            ui::info(&format!(
                "Watching \"{}\" for changes (recursive)",
                watcher.root().display()
            ));
            (Some(watcher), Some(rx))
        }
        Err(e) => {
            ui::error(&e.to_string());
            ui::warning("Live reload disabled; static files are still served");
            (None, None)
        }
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = DevServer::new(AppState::new(config.root, Arc::clone(&registry)));
    let mut server_handle = tokio::spawn(server.start(listener, async move {
        let _ = shutdown_rx.await;
    }));

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(change) = next_change(&mut change_rx) => {
                handle_file_change(&change, &debouncer);
            }

            _ = &mut shutdown => break,

            result = &mut server_handle => {
                return match result {
                    Ok(outcome) => outcome,
                    Err(e) => Err(CliError::Server(format!("Server task failed: {}", e))),
                };
            }
        }
    }

    drop(watcher);
    let _ = shutdown_tx.send(());
    registry.close_all();

    match tokio::time::timeout(SHUTDOWN_GRACE, &mut server_handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => Err(CliError::Server(format!("Server task failed: {}", e))),
        Err(_) => {
            server_handle.abort();
            ui::warning("Closed remaining connections");
            Ok(())
        }
    }
}

/// Next change from the watcher, or never if there is no watcher.
async fn next_change(rx: &mut Option<mpsc::Receiver<FileChange>>) -> Option<FileChange> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Log a change and restart the reload window.
fn handle_file_change(change: &FileChange, debouncer: &DebounceHandle) {
    tracing::info!("watch {}: {}", change.kind, change.label());
    debouncer.schedule();
}
