//! Observer channels: the "event hooks as callbacks -> explicit observer
//! channel" redesign note applied to transfer progress and pool health.
//!
//! Both [`TransferEvent`] and [`HealthChange`] ride the same [`EventBus`],
//! a multi-subscriber, backpressure-free fan-out built on `async_channel` —
//! `emit` never blocks the caller and a slow/closed subscriber only loses
//! events for itself, it never stalls publication for anyone else.

use async_channel::{Receiver, Sender};
use std::sync::Mutex;

/// Direction of a completed transfer chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Read,
    Write,
}

/// Emitted once per completed `read`/`write` call: a data-transfer
/// notification fires each time an I/O operation completes a chunk,
/// carrying byte counts.
#[derive(Debug, Clone)]
pub struct TransferEvent {
    pub path: String,
    pub direction: TransferDirection,
    pub bytes: usize,
}

/// Pool connection health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// A health status transition, emitted to pool subscribers as `{old, new}`.
#[derive(Debug, Clone, Copy)]
pub struct HealthChange {
    pub old: HealthStatus,
    pub new: HealthStatus,
}

/// Multi-subscriber fan-out. Subscribers that fall behind or close are
/// skipped, never awaited.
pub struct EventBus<T: Clone> {
    subscribers: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone> EventBus<T> {
    pub fn new() -> Self {
        EventBus { subscribers: Mutex::new(Vec::new()) }
    }

    /// Registers a new subscriber with a bounded mailbox and returns its
    /// receiving half.
    pub fn subscribe(&self, capacity: usize) -> Receiver<T> {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Publishes `event` to every live subscriber. A full or closed mailbox
    /// simply drops the event for that one subscriber.
    pub fn emit(&self, event: T) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|tx| !tx.is_closed());
        for tx in subs.iter() {
            let _ = tx.try_send(event.clone());
        }
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_receives_emitted_event() {
        let bus: EventBus<u32> = EventBus::new();
        let rx = bus.subscribe(4);
        bus.emit(7);
        assert_eq!(rx.try_recv().unwrap(), 7);
    }

    #[test]
    fn emit_with_no_subscribers_does_not_panic() {
        let bus: EventBus<u32> = EventBus::new();
        bus.emit(1);
    }

    #[test]
    fn dropped_receiver_is_pruned_on_next_emit() {
        let bus: EventBus<u32> = EventBus::new();
        let rx = bus.subscribe(1);
        drop(rx);
        bus.emit(1);
        assert_eq!(bus.subscribers.lock().unwrap().len(), 0);
    }

    #[test]
    fn full_mailbox_drops_event_without_blocking() {
        let bus: EventBus<u32> = EventBus::new();
        let rx = bus.subscribe(1);
        bus.emit(1);
        bus.emit(2); // mailbox already full, dropped rather than blocking
        assert_eq!(rx.try_recv().unwrap(), 1);
        assert!(rx.try_recv().is_err());
    }
}
