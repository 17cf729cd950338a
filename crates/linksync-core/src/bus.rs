//! In-memory selection bus.
//!
//! Every surface publishes here. The bus stamps each event with a strictly
//! increasing sequence number, notifies subscribers in registration order and
//! queues the event for the synchronization pass. Echoes of selections the
//! dispatcher applied are dropped at publish time, so a command never feeds
//! back into the synchronizer.

use std::collections::VecDeque;
use std::fmt;
use tracing::trace;

use crate::model::{EventPayload, Provenance, SelectionEvent};

/// Handle returned by [`SelectionBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&SelectionEvent) + Send>;

/// Single logical stream of selection events.
pub struct SelectionBus {
    next_seq: u64,
    next_subscription: u64,
    subscribers: Vec<(SubscriptionId, Handler)>,
    pending: VecDeque<SelectionEvent>,
    published: u64,
    suppressed: u64,
}

impl SelectionBus {
    pub fn new() -> Self {
        Self {
            next_seq: 1,
            next_subscription: 0,
            subscribers: Vec::new(),
            pending: VecDeque::new(),
            published: 0,
            suppressed: 0,
        }
    }

    /// Publish an event.
    ///
    /// Returns the assigned sequence number, or `None` when the event was a
    /// dispatcher echo and got dropped. Repeated selections are never
    /// coalesced.
    pub fn publish(&mut self, payload: EventPayload, provenance: Provenance) -> Option<u64> {
        if provenance == Provenance::Dispatcher {
            self.suppressed += 1;
            trace!(surface = %payload.surface(), "dropped dispatcher echo");
            return None;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.published += 1;

        let event = SelectionEvent {
            seq,
            provenance,
            payload,
        };
        trace!(seq, surface = %event.payload.surface(), ?provenance, "published");
        for (_, handler) in self.subscribers.iter_mut() {
            handler(&event);
        }
        self.pending.push_back(event);
        Some(seq)
    }

    /// Register a handler called for every delivered event.
    pub fn subscribe(&mut self, handler: impl FnMut(&SelectionEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Oldest event not yet taken by the synchronization pass.
    pub fn next_pending(&mut self) -> Option<SelectionEvent> {
        self.pending.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Events delivered so far.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Dispatcher echoes dropped so far.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for SelectionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SelectionBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionBus")
            .field("next_seq", &self.next_seq)
            .field("subscribers", &self.subscribers.len())
            .field("pending", &self.pending.len())
            .field("published", &self.published)
            .field("suppressed", &self.suppressed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn closed(name: &str) -> EventPayload {
        EventPayload::EditorClosed {
            file: PathBuf::from(name),
        }
    }

    #[test]
    fn test_sequence_is_strictly_increasing() {
        let mut bus = SelectionBus::new();
        let a = bus.publish(closed("A.java"), Provenance::User).unwrap();
        let b = bus.publish(closed("A.java"), Provenance::User).unwrap();
        assert!(b > a);
        assert_eq!(bus.next_pending().unwrap().seq, a);
        assert_eq!(bus.next_pending().unwrap().seq, b);
        assert!(bus.next_pending().is_none());
    }

    #[test]
    fn test_dispatcher_echo_dropped() {
        let mut bus = SelectionBus::new();
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        bus.subscribe(move |_| *counter.lock().unwrap() += 1);

        assert!(bus.publish(closed("A.java"), Provenance::Dispatcher).is_none());
        assert!(bus.publish(closed("A.java"), Provenance::User).is_some());
        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(bus.published(), 1);
        assert_eq!(bus.suppressed(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = SelectionBus::new();
        let id = bus.subscribe(|_| {});
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
