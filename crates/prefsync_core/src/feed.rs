//! Change feed for observing committed key changes.
//!
//! The feed emits one event per changed key, whether the change came from
//! a local commit or a remote-originated replace. Subscribers receive
//! events over channels; a dropped receiver is cleaned up on the next
//! emit and can never block delivery to the others.

use crate::diff::{ChangeKind, KeyChange};
use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, Sender};

/// A single key-change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChangeEvent {
    /// The affected key.
    pub key: String,
    /// How the key changed.
    pub kind: ChangeKind,
}

impl From<KeyChange> for KeyChangeEvent {
    fn from(change: KeyChange) -> Self {
        Self {
            key: change.key,
            kind: change.kind,
        }
    }
}

/// Distributes key-change events to subscribers.
pub struct ChangeFeed {
    subscribers: RwLock<Vec<Sender<KeyChangeEvent>>>,
}

impl ChangeFeed {
    /// Creates a feed with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribes to the feed.
    ///
    /// Returns a receiver that gets all future events. Dropping the
    /// receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<KeyChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits one event to all subscribers, dropping disconnected ones.
    pub fn emit(&self, event: KeyChangeEvent) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Emits the events of one commit or replace, in order.
    pub fn emit_batch(&self, changes: Vec<KeyChange>) {
        for change in changes {
            self.emit(change.into());
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn emit_and_receive() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe();

        feed.emit(KeyChangeEvent {
            key: "theme".into(),
            kind: ChangeKind::Added,
        });

        let event = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(event.key, "theme");
        assert_eq!(event.kind, ChangeKind::Added);
    }

    #[test]
    fn multiple_subscribers() {
        let feed = ChangeFeed::new();
        let rx1 = feed.subscribe();
        let rx2 = feed.subscribe();

        feed.emit(KeyChangeEvent {
            key: "k".into(),
            kind: ChangeKind::Updated,
        });

        assert_eq!(rx1.recv().unwrap().key, "k");
        assert_eq!(rx2.recv().unwrap().key, "k");
    }

    #[test]
    fn dropped_subscriber_is_cleaned_up() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        drop(rx);
        feed.emit(KeyChangeEvent {
            key: "k".into(),
            kind: ChangeKind::Removed,
        });
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn batch_preserves_order() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe();

        feed.emit_batch(vec![
            KeyChange::new("a", ChangeKind::Added),
            KeyChange::new("b", ChangeKind::Removed),
        ]);

        assert_eq!(rx.recv().unwrap().key, "a");
        assert_eq!(rx.recv().unwrap().key, "b");
    }
}
