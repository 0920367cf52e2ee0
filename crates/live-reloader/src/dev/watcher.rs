//! Recursive file system watcher for the served root.
//!
//! Every change under the root is forwarded; nothing is filtered by name or
//! kind. Pure access notifications (open, read, close-without-write) are not
//! changes and are dropped at the source.

use crate::error::{CliError, Result};
use notify::event::{EventKind, ModifyKind};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Channel capacity between the watcher thread and the serve loop.
const CHANGE_BUFFER: usize = 100;

/// Kind of a file change, for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Modify,
    Rename,
    Remove,
    Other,
}

impl ChangeKind {
    /// Map a notify event kind; `None` for access-only events.
    pub fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Access(_) => None,
            EventKind::Create(_) => Some(ChangeKind::Create),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Rename),
            EventKind::Modify(_) => Some(ChangeKind::Modify),
            EventKind::Remove(_) => Some(ChangeKind::Remove),
            EventKind::Any | EventKind::Other => Some(ChangeKind::Other),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Create => "create",
            ChangeKind::Modify => "modify",
            ChangeKind::Rename => "rename",
            ChangeKind::Remove => "remove",
            ChangeKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// One change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub kind: ChangeKind,
    /// Affected file relative to the watched root, when the backend knows it.
    pub path: Option<PathBuf>,
}

impl FileChange {
    /// Split a notify event into one change per affected path.
    pub fn from_event(event: &Event, root: &Path) -> Vec<FileChange> {
        let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
            return Vec::new();
        };

        if event.paths.is_empty() {
            return vec![FileChange { kind, path: None }];
        }

        event
            .paths
            .iter()
            .map(|path| FileChange {
                kind,
                path: Some(path.strip_prefix(root).unwrap_or(path).to_path_buf()),
            })
            .collect()
    }

    /// Display name for logs.
    pub fn label(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "(unknown file)".to_string(),
        }
    }
}

/// Recursive watcher over the served root.
///
/// The first backend error is logged and stops forwarding: reloads end, static
/// serving carries on.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
    failed: Arc<AtomicBool>,
}

impl FileWatcher {
    /// Start watching `root` recursively.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FileNotFound`] for a missing root and
    /// [`CliError::Watch`] if the backend cannot be set up.
    pub fn new(root: PathBuf) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(CHANGE_BUFFER);
        let failed = Arc::new(AtomicBool::new(false));
        let failed_flag = Arc::clone(&failed);
        let root_clone = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if failed_flag.load(Ordering::Relaxed) {
                return;
            }

            match res {
                Ok(event) => {
                    for change in FileChange::from_event(&event, &root_clone) {
                        // Runs on the notify thread, outside the runtime.
                        if tx.blocking_send(change).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    failed_flag.store(true, Ordering::Relaxed);
                    tracing::error!("watch error: {}", e);
                    tracing::warn!("live reload disabled; static files are still served");
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
                failed,
            },
            rx,
        ))
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the backend reported an error and forwarding stopped.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileWatcher")
            .field("root", &self.root)
            .field("failed", &self.has_failed())
            .finish()
    }
}
