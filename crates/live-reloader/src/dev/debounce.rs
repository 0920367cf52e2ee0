//! Collapses bursts of file changes into a single reload broadcast.
//!
//! One task owns the pending timer. Callers only get a [`DebounceHandle`]
//! whose [`schedule`](DebounceHandle::schedule) pushes the deadline back; the
//! broadcast fires once the window passes with no further calls.

use crate::dev::registry::ReceiverRegistry;
use axum::body::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default quiet period.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(75);

/// Payload sent to every receiver when the timer fires.
pub const RELOAD_PAYLOAD: &[u8] = b"reload";

/// Cheap, cloneable trigger for the debouncer task.
#[derive(Debug, Clone)]
pub struct DebounceHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl DebounceHandle {
    /// Start or restart the quiet window.
    pub fn schedule(&self) {
        // The task only stops once every handle is gone.
        let _ = self.tx.send(());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Idle,
    Pending { deadline: Instant },
}

/// Spawn the debouncer task on the current runtime.
///
/// The task exits when every [`DebounceHandle`] has been dropped, firing a
/// still-pending reload first.
pub fn spawn(window: Duration, registry: Arc<ReceiverRegistry>) -> (DebounceHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(rx, window, registry));
    (DebounceHandle { tx }, task)
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<()>,
    window: Duration,
    registry: Arc<ReceiverRegistry>,
) {
    let payload = Bytes::from_static(RELOAD_PAYLOAD);
    let mut state = DebounceState::Idle;

    loop {
        state = match state {
            DebounceState::Idle => match rx.recv().await {
                Some(()) => DebounceState::Pending {
                    deadline: Instant::now() + window,
                },
                None => break,
            },
            DebounceState::Pending { deadline } => {
                tokio::select! {
                    biased;

                    event = rx.recv() => match event {
                        Some(()) => DebounceState::Pending {
                            deadline: Instant::now() + window,
                        },
                        None => {
                            fire(&registry, &payload);
                            break;
                        }
                    },
                    _ = tokio::time::sleep_until(deadline) => {
                        fire(&registry, &payload);
                        DebounceState::Idle
                    }
                }
            }
        };
    }

    tracing::debug!("debouncer stopped");
}

fn fire(registry: &ReceiverRegistry, payload: &Bytes) {
    let delivered = registry.broadcast(payload);
    if delivered > 0 {
        tracing::info!("reload broadcast -> {} client(s)", delivered);
    }
}
