//! Registry of open reload streams.
//!
//! Each connected page owns one [`Receiver`]. The registry is the only state
//! shared between request handlers and the debounce timer, so every operation
//! goes through a single `parking_lot` mutex and never awaits while holding it.

use axum::body::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Messages buffered per receiver before further broadcasts coalesce.
const RECEIVER_BUFFER: usize = 8;

/// Identity of a receiver; the registry is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(u64);

/// Sending half of one notification stream.
#[derive(Debug, Clone)]
pub struct Receiver {
    id: ReceiverId,
    tx: mpsc::Sender<Bytes>,
}

impl Receiver {
    pub fn id(&self) -> ReceiverId {
        self.id
    }
}

/// Thread-safe set of live receivers.
#[derive(Debug, Default)]
pub struct ReceiverRegistry {
    receivers: Mutex<HashMap<ReceiverId, mpsc::Sender<Bytes>>>,
    next_id: AtomicU64,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a receiver and the stream end it writes to.
    ///
    /// The receiver is not registered yet.
    pub fn channel(&self) -> (Receiver, mpsc::Receiver<Bytes>) {
        let id = ReceiverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(RECEIVER_BUFFER);
        (Receiver { id, tx }, rx)
    }

    /// Add a receiver. Registering the same receiver twice keeps one entry.
    pub fn register(&self, receiver: Receiver) {
        self.receivers
            .lock()
            .entry(receiver.id)
            .or_insert(receiver.tx);
    }

    /// Remove a receiver; unknown ids are ignored.
    pub fn unregister(&self, id: ReceiverId) {
        self.receivers.lock().remove(&id);
    }

    /// Create, register and guard a receiver in one step.
    ///
    /// Dropping the returned [`Registration`] unregisters the receiver, so a
    /// stream that owns it cleans up when the client goes away.
    pub fn subscribe(self: &Arc<Self>) -> (Registration, mpsc::Receiver<Bytes>) {
        let (receiver, rx) = self.channel();
        let id = receiver.id();
        self.register(receiver);
        (
            Registration {
                registry: Arc::clone(self),
                id,
            },
            rx,
        )
    }

    /// Deliver `payload` to every receiver and return how many accepted it.
    ///
    /// Receivers whose stream is gone are removed during the call. A receiver
    /// with a full buffer already has a reload queued and counts as delivered.
    pub fn broadcast(&self, payload: &Bytes) -> usize {
        let mut delivered = 0;
        self.receivers
            .lock()
            .retain(|id, tx| match tx.try_send(payload.clone()) {
                Ok(()) | Err(TrySendError::Full(_)) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!("dropping closed receiver {:?}", id);
                    false
                }
            });
        delivered
    }

    /// Drop every receiver so open streams end. Returns how many were removed.
    pub fn close_all(&self) -> usize {
        let mut receivers = self.receivers.lock();
        let count = receivers.len();
        receivers.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.receivers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.lock().is_empty()
    }
}

/// Keeps a receiver registered for as long as it lives.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<ReceiverRegistry>,
    id: ReceiverId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
        tracing::info!("SSE disconnected (clients={})", self.registry.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Bytes {
        Bytes::from_static(b"reload")
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = ReceiverRegistry::new();
        let (receiver, _rx) = registry.channel();

        registry.register(receiver.clone());
        registry.register(receiver);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let registry = ReceiverRegistry::new();
        let (receiver, _rx) = registry.channel();
        let id = receiver.id();
        registry.register(receiver);

        registry.unregister(id);
        registry.unregister(id);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_channel_ids_are_unique() {
        let registry = ReceiverRegistry::new();
        let (a, _rx_a) = registry.channel();
        let (b, _rx_b) = registry.channel();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_all() {
        let registry = ReceiverRegistry::new();
        let mut streams = Vec::new();
        for _ in 0..3 {
            let (receiver, rx) = registry.channel();
            registry.register(receiver);
            streams.push(rx);
        }

        assert_eq!(registry.broadcast(&payload()), 3);
        for rx in &mut streams {
            assert_eq!(rx.recv().await.unwrap(), payload());
        }
    }

    #[tokio::test]
    async fn test_broadcast_removes_failed_receivers() {
        let registry = ReceiverRegistry::new();
        let (alive, mut alive_rx) = registry.channel();
        let (dead, dead_rx) = registry.channel();
        registry.register(alive);
        registry.register(dead);
        drop(dead_rx);

        assert_eq!(registry.broadcast(&payload()), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(alive_rx.recv().await.unwrap(), payload());

        // The dead receiver is gone, not retried.
        assert_eq!(registry.broadcast(&payload()), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_full_receiver_counts_as_delivered() {
        let registry = ReceiverRegistry::new();
        let (receiver, _rx) = registry.channel();
        registry.register(receiver);

        for _ in 0..RECEIVER_BUFFER + 3 {
            assert_eq!(registry.broadcast(&payload()), 1);
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_subscribe_guard_unregisters_on_drop() {
        let registry = Arc::new(ReceiverRegistry::new());
        let (registration, _rx) = registry.subscribe();
        assert_eq!(registry.len(), 1);

        drop(registration);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_close_all_ends_streams() {
        let registry = Arc::new(ReceiverRegistry::new());
        let (_registration, mut rx) = registry.subscribe();

        assert_eq!(registry.close_all(), 1);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_concurrent_membership_and_broadcast() {
        let registry = Arc::new(ReceiverRegistry::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    let (registration, rx) = registry.subscribe();
                    registry.broadcast(&Bytes::from_static(b"reload"));
                    drop(rx);
                    drop(registration);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(registry.is_empty());
    }
}
