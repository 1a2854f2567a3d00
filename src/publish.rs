//! Event publisher: fan-out to live push subscribers
//!
//! Subscribers register explicitly and are removed either by unregistering
//! or when a delivery to them fails (treated as a disconnect, not an error
//! to the publishing caller). Membership and broadcast iteration are
//! serialized by one lock.

use crate::events::PushMessage;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Handle identifying one subscriber
pub type SubscriberId = u64;

#[derive(Default)]
struct Subscribers {
    next_id: SubscriberId,
    senders: HashMap<SubscriberId, mpsc::UnboundedSender<PushMessage>>,
}

/// Fan-out publisher for push messages
#[derive(Default)]
pub struct Publisher {
    inner: Mutex<Subscribers>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber, returning its id and message stream.
    pub fn register(&self) -> (SubscriberId, mpsc::UnboundedReceiver<PushMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().expect("publisher lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.senders.insert(id, tx);
        debug!("subscriber {} registered ({} live)", id, inner.senders.len());
        (id, rx)
    }

    /// Remove a subscriber explicitly (e.g. on clean disconnect).
    pub fn unregister(&self, id: SubscriberId) {
        let mut inner = self.inner.lock().expect("publisher lock poisoned");
        if inner.senders.remove(&id).is_some() {
            debug!("subscriber {} unregistered ({} live)", id, inner.senders.len());
        }
    }

    /// Deliver a message to every live subscriber.
    ///
    /// A failed delivery removes that subscriber; other subscribers are
    /// unaffected and the caller never sees the failure. No ordering is
    /// guaranteed across subscribers.
    pub fn publish(&self, message: &PushMessage) {
        let mut inner = self.inner.lock().expect("publisher lock poisoned");
        inner.senders.retain(|id, tx| {
            let delivered = tx.send(message.clone()).is_ok();
            if !delivered {
                debug!("subscriber {} dropped on failed delivery", id);
            }
            delivered
        });
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("publisher lock poisoned").senders.len()
    }
}
