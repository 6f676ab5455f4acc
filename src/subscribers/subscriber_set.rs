//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`], which distributes registry events to several
//! subscribers without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► accepts? ──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │                 (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► accepts? ──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     └──► accepts? ──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while B processes N+5
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Per-subscriber FIFO**: each subscriber sees accepted events in order
//!
//! ## Panic handling
//! Workers wrap each `on_event` in `catch_unwind`: the panic becomes a
//! `SubscriberPanicked` event and the worker moves on to the next event.
//! `AssertUnwindSafe` is used, so a subscriber that panics while holding a lock
//! may leave its own state inconsistent.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    subscriber: Arc<dyn Subscribe>,
    sender: mpsc::Sender<Arc<Event>>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fan-out coordinator for registry subscribers.
///
/// Owns one bounded queue and one worker task per subscriber. Delivery problems
/// are reported back on the [`Bus`] as subscriber events.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime with a non-empty `subs`.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let worker_sub = Arc::clone(&sub);
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = worker_sub.on_event(ev.as_ref());
                    if let Err(payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        worker_bus.publish(Event::subscriber_panicked(
                            worker_sub.name(),
                            panic_message(payload.as_ref()),
                        ));
                    }
                }
            });
            channels.push(SubscriberChannel {
                subscriber: sub,
                sender: tx,
            });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to all subscribers that accept it. Never blocks.
    ///
    /// Overflow events are not re-published if they themselves overflow.
    pub fn emit(&self, event: Arc<Event>) {
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            if !channel.subscriber.accepts(&event) {
                continue;
            }
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.subscriber.name(), reason));
            }
        }
    }

    /// Closes all queues and waits for workers to drain them.
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    struct Recorder {
        seen: Arc<Mutex<Vec<u64>>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().push(ev.seq);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }

        fn accepts(&self, ev: &Event) -> bool {
            ev.kind != EventKind::CancelRequested
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber exploded");
        }

        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    struct Stuck {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl Subscribe for Stuck {
        async fn on_event(&self, _ev: &Event) {
            self.gate.notified().await;
        }

        fn name(&self) -> &'static str {
            "stuck"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_delivers_accepted_events_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = SubscriberSet::new(
            vec![Arc::new(Recorder { seen: seen.clone() })],
            Bus::new(16),
        );

        let a = Event::new(EventKind::TaskTracked);
        let skipped = Event::new(EventKind::CancelRequested);
        let b = Event::new(EventKind::TaskEvicted);
        let expected = vec![a.seq, b.seq];
        for ev in [a, skipped, b] {
            set.emit(Arc::new(ev));
        }
        set.shutdown().await;

        assert_eq!(*seen.lock(), expected);
    }

    #[tokio::test]
    async fn test_panic_is_reported_and_worker_survives() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Panicker)], bus);

        set.emit(Arc::new(Event::new(EventKind::TaskTracked)));
        set.emit(Arc::new(Event::new(EventKind::TaskTracked)));
        set.shutdown().await;

        for _ in 0..2 {
            let ev = rx.recv().await.unwrap();
            assert!(ev.is_subscriber_panic());
            assert_eq!(ev.subscriber, Some("panicker"));
            assert_eq!(ev.reason.as_deref(), Some("subscriber exploded"));
        }
    }

    #[tokio::test]
    async fn test_full_queue_reports_overflow() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let gate = Arc::new(Notify::new());
        let set = SubscriberSet::new(vec![Arc::new(Stuck { gate: gate.clone() })], bus);

        // first event is taken by the worker, second fills the queue
        set.emit(Arc::new(Event::new(EventKind::TaskTracked)));
        tokio::task::yield_now().await;
        set.emit(Arc::new(Event::new(EventKind::TaskTracked)));
        set.emit(Arc::new(Event::new(EventKind::TaskTracked)));

        let ev = rx.recv().await.unwrap();
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.subscriber, Some("stuck"));
        assert_eq!(ev.reason.as_deref(), Some("full"));

        gate.notify_waiters();
        drop(set);
    }
}
