use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::config::Config;
use crate::events::Bus;
use crate::registry::task_registry::TaskRegistry;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for [`TaskRegistry`] with optional event subscribers.
pub struct RegistryBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RegistryBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive registry events through dedicated workers with bounded
    /// queues. A non-empty set requires building inside a Tokio runtime.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: impl Subscribe) -> Self {
        self.subscribers.push(Arc::new(subscriber));
        self
    }

    /// Builds the registry and, if there are subscribers, spawns its listener.
    ///
    /// The listener stops when the last registry handle is dropped, after
    /// delivering already-published events.
    pub fn build(self) -> TaskRegistry {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            Some(spawn_listener(&bus, set))
        };
        TaskRegistry::from_parts(&self.cfg, bus, listener)
    }
}

/// Forwards bus events to `set` until the returned guard is dropped.
fn spawn_listener(bus: &Bus, set: SubscriberSet) -> DropGuard {
    let token = CancellationToken::new();
    let stop = token.clone();
    let mut rx = bus.subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.cancelled() => {
                    loop {
                        match rx.try_recv() {
                            Ok(ev) => set.emit(Arc::new(ev)),
                            Err(TryRecvError::Lagged(_)) => continue,
                            Err(_) => break,
                        }
                    }
                    break;
                }
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(Arc::new(ev)),
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(_)) => continue,
                }
            }
        }
        set.shutdown().await;
    });

    token.drop_guard()
}
