//! Bounded, non-blocking finished-event transport.
//!
//! Producers (probe handlers) publish whole [`EventRecord`]s into a
//! bounded multi-producer/single-consumer channel sized like the
//! reference 256 KiB ring.  A full channel drops the record: the
//! probed system's forward progress always outranks completeness of
//! the event stream, so the producer side never waits.

use log::trace;
use meshtrace_protocol::{EventRecord, RING_CAPACITY};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// Producer half of the event transport. Cloneable per probe context.
#[derive(Clone)]
pub struct EventRing {
    tx: SyncSender<EventRecord>,
    dropped: Arc<AtomicU64>,
}

/// Consumer half of the event transport.
pub struct EventRx {
    rx: Receiver<EventRecord>,
}

/// Create a transport bounded at the reference ring capacity.
pub fn ring() -> (EventRing, EventRx) {
    ring_with_capacity(RING_CAPACITY)
}

/// Create a transport bounded at `capacity` records.
pub fn ring_with_capacity(capacity: usize) -> (EventRing, EventRx) {
    let (tx, rx) = sync_channel(capacity);
    (
        EventRing {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        EventRx { rx },
    )
}

impl EventRing {
    /// Publish a record; returns `false` if it was dropped.
    ///
    /// Never blocks. A record becomes visible to the consumer only as
    /// a complete value. Backpressure and a disconnected consumer are
    /// both treated as a drop.
    pub fn try_emit(&self, rec: EventRecord) -> bool {
        match self.tx.try_send(rec) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("event ring full, dropped {} record", rec.action);
                false
            }
        }
    }

    /// Records dropped on backpressure since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventRx {
    /// Take the next published record, if one is ready.
    pub fn try_next(&self) -> Option<EventRecord> {
        match self.rx.try_recv() {
            Ok(rec) => Some(rec),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Block up to `timeout` for the next record.
    pub fn next_timeout(&self, timeout: Duration) -> Option<EventRecord> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Drain everything currently published.
    pub fn drain(&self) -> Vec<EventRecord> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtrace_protocol::Action;

    #[test]
    fn emit_then_receive() {
        let (ring, rx) = ring_with_capacity(4);
        assert!(ring.try_emit(EventRecord::zeroed(Action::TxAdd)));
        let rec = rx.try_next().unwrap();
        assert_eq!(rec.action, Action::TxAdd);
        assert!(rx.try_next().is_none());
    }

    #[test]
    fn full_ring_drops_without_blocking() {
        let (ring, rx) = ring_with_capacity(2);
        assert!(ring.try_emit(EventRecord::zeroed(Action::TxAdd)));
        assert!(ring.try_emit(EventRecord::zeroed(Action::RxAdd)));
        assert!(!ring.try_emit(EventRecord::zeroed(Action::UsAdd)));
        assert_eq!(ring.dropped(), 1);

        // Earlier records are unaffected by the drop.
        let drained = rx.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].action, Action::TxAdd);
        assert_eq!(drained[1].action, Action::RxAdd);
    }

    #[test]
    fn disconnected_consumer_counts_as_drop() {
        let (ring, rx) = ring_with_capacity(2);
        drop(rx);
        assert!(!ring.try_emit(EventRecord::zeroed(Action::TxAdd)));
        assert_eq!(ring.dropped(), 1);
    }

    #[test]
    fn producers_clone_per_context() {
        let (ring, rx) = ring_with_capacity(8);
        let other = ring.clone();
        assert!(ring.try_emit(EventRecord::zeroed(Action::TxAdd)));
        assert!(other.try_emit(EventRecord::zeroed(Action::RxAdd)));
        assert_eq!(rx.drain().len(), 2);
    }
}
