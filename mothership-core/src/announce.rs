//! Push notifications for clients that keep a stream open instead of
//! polling.
//!
//! Every listener gets a small bounded queue. A listener that falls
//! [`QUEUE_SIZE`] events behind, or whose receiver was dropped, is removed
//! on the next announcement.

use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Events a listener may have queued before it is dropped.
pub const QUEUE_SIZE: usize = 5;

/// Fan-out of values to any number of listeners.
#[derive(Debug)]
pub struct Announcer<T> {
    listeners: Mutex<Vec<mpsc::Sender<T>>>,
}

impl<T> Default for Announcer<T> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> Announcer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn listen(&self) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel(QUEUE_SIZE);
        self.lock().push(tx);
        rx
    }

    /// Send `value` to every live listener and drop the rest.
    pub fn announce(&self, value: T) {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|tx| tx.try_send(value.clone()).is_ok());
        let dropped = before - listeners.len();
        if dropped > 0 {
            debug!(dropped, remaining = listeners.len(), "dropped stalled listeners");
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::Sender<T>>> {
        // A panic while holding the lock leaves the list itself intact.
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listeners_receive_announcements() {
        let announcer = Announcer::new();
        let mut a = announcer.listen();
        let mut b = announcer.listen();

        announcer.announce(7u64);

        assert_eq!(a.recv().await, Some(7));
        assert_eq!(b.recv().await, Some(7));
        assert_eq!(announcer.listener_count(), 2);
    }

    #[tokio::test]
    async fn test_full_queue_drops_listener() {
        let announcer = Announcer::new();
        let mut slow = announcer.listen();

        for i in 0..QUEUE_SIZE as u64 {
            announcer.announce(i);
        }
        assert_eq!(announcer.listener_count(), 1);

        announcer.announce(99);
        assert_eq!(announcer.listener_count(), 0);

        // What was queued before the drop is still delivered.
        assert_eq!(slow.recv().await, Some(0));
    }

    #[test]
    fn test_closed_receiver_is_removed() {
        let announcer = Announcer::new();
        let rx = announcer.listen();
        drop(rx);

        announcer.announce("update".to_string());
        assert_eq!(announcer.listener_count(), 0);
    }
}
