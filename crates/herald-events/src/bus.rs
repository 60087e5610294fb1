//! Event bus facade.

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::config::BusConfig;
use crate::guard::{ProducerGuard, Subscription};
use crate::handler::{Generators, Handlers, Installed};
use crate::id::{ListenerId, ProducerId};
use crate::record::{ListenerRecord, ProducerRecord};
use crate::registry::{Registries, RegistryStats};

pub(crate) struct BusInner {
    config: Arc<BusConfig>,
    registries: Registries,
    listeners: DashMap<ListenerId, ListenerRecord>,
    producers: DashMap<ProducerId, ProducerRecord>,
}

/// Type-indexed event bus.
///
/// Handlers are registered per event type and invoked synchronously, in
/// registration order, by [`send`](Self::send). Generators registered by
/// producers supply current values that are replayed to each newly
/// subscribed handler of the same type.
///
/// Clones share the same registries and records. The bus is `Send + Sync`;
/// every registry has its own lock and no lock is held while user callbacks
/// run, so handlers and generators may call back into the bus.
///
/// Slots removed while a delivery of their type is in flight are compacted
/// once no delivery of that type is running on any thread. If sends from
/// several threads overlap without pause, those empty slots accumulate until
/// the traffic quiesces. The removed callables are still released at
/// removal, or when the delivery holding them returns.
///
/// **WARNING:** a handler or generator that captures a clone of the bus it is
/// registered on forms an `Arc` cycle, and the bus will never be freed while
/// that registration exists. Unsubscribe explicitly to break the cycle.
#[derive(Clone)]
pub struct EventBus {
    pub(crate) inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a bus with the given configuration.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        let config = Arc::new(config);
        Self {
            inner: Arc::new(BusInner {
                registries: Registries::new(Arc::clone(&config)),
                listeners: DashMap::new(),
                producers: DashMap::new(),
                config,
            }),
        }
    }

    /// The process-wide bus, created on first use and never torn down.
    pub fn global() -> &'static EventBus {
        static GLOBAL: OnceLock<EventBus> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::with_config(BusConfig::new("global")))
    }

    /// The configuration this bus was created with.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Register `handlers` under listener `id`.
    ///
    /// The first call for an id creates its record; later calls with the
    /// same id add to that record. Each new handler immediately receives the
    /// current value of every live generator of its event type (from any
    /// producer), synchronously, before this call returns. Existing handlers
    /// are not notified.
    ///
    /// Returns `id` for chaining.
    pub fn subscribe(&self, id: ListenerId, handlers: Handlers) -> ListenerId {
        let count = handlers.len();
        self.inner
            .listeners
            .entry(id)
            .or_insert_with(|| ListenerRecord::new(id));

        let mut replayed: usize = 0;
        for install in handlers.into_pending() {
            let Installed {
                attachment,
                replay,
                event_type,
            } = install(&self.inner.registries);

            let added = self
                .inner
                .listeners
                .entry(id)
                .or_insert_with(|| ListenerRecord::new(id))
                .add(attachment);
            debug_assert!(added, "slot ids are never reused within a registry");
            trace!(bus = %self.inner.config.name, listener_id = %id, event_type, "Handler registered");

            if let Some(replay) = replay {
                replayed = replayed.saturating_add(replay());
            }
        }

        debug!(
            bus = %self.inner.config.name,
            listener_id = %id,
            handlers = count,
            replayed,
            "Listener subscribed"
        );
        id
    }

    /// Register `handlers` under a fresh listener id.
    pub fn listen(&self, handlers: Handlers) -> ListenerId {
        self.subscribe(ListenerId::new(), handlers)
    }

    /// Register `handlers` under a fresh id and tie their lifetime to the
    /// returned guard.
    pub fn subscribe_scoped(&self, handlers: Handlers) -> Subscription {
        let id = self.listen(handlers);
        Subscription::new(Arc::downgrade(&self.inner), id)
    }

    /// Retract every handler registered under `id`.
    ///
    /// Returns `false` if `id` has no record (already unsubscribed, or never
    /// subscribed); that case is a no-op.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from a released handler's destructor, after every
    /// handler under `id` has been retracted.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        // The record is dropped after the map shard lock is released.
        let Some((_, record)) = self.inner.listeners.remove(&id) else {
            trace!(bus = %self.inner.config.name, listener_id = %id, "Unsubscribe ignored: no record");
            return false;
        };

        let handlers = record.len();
        drop(record);
        debug!(
            bus = %self.inner.config.name,
            listener_id = %id,
            handlers,
            "Listener unsubscribed"
        );
        true
    }

    /// Deliver `event` to every handler of type `E`, in registration order.
    ///
    /// Returns the number of handlers that ran to completion. Sending a type
    /// nobody has subscribed to is a no-op that returns `0`.
    pub fn send<E: 'static>(&self, event: &E) -> usize {
        let Some(registry) = self.inner.registries.get::<E>() else {
            trace!(
                bus = %self.inner.config.name,
                event_type = type_name::<E>(),
                "No registry for event type"
            );
            return 0;
        };

        let delivered = registry.send(event);
        trace!(
            bus = %self.inner.config.name,
            event_type = type_name::<E>(),
            delivered,
            "Event sent"
        );
        delivered
    }

    /// Register `generators` under producer `id`.
    ///
    /// Registration never pushes values to existing handlers; generators
    /// are only consulted when a handler of their type subscribes later.
    /// Reusing an id adds to its existing record.
    pub fn register_producer(&self, id: ProducerId, generators: Generators) -> ProducerId {
        let count = generators.len();
        self.inner
            .producers
            .entry(id)
            .or_insert_with(|| ProducerRecord::new(id));

        for install in generators.into_pending() {
            let Installed {
                attachment,
                event_type,
                ..
            } = install(&self.inner.registries);

            let added = self
                .inner
                .producers
                .entry(id)
                .or_insert_with(|| ProducerRecord::new(id))
                .add(attachment);
            debug_assert!(added, "slot ids are never reused within a registry");
            trace!(bus = %self.inner.config.name, producer_id = %id, event_type, "Generator registered");
        }

        debug!(
            bus = %self.inner.config.name,
            producer_id = %id,
            generators = count,
            "Producer registered"
        );
        id
    }

    /// Register `generators` under a fresh producer id.
    pub fn produce(&self, generators: Generators) -> ProducerId {
        self.register_producer(ProducerId::new(), generators)
    }

    /// Register `generators` under a fresh id and tie their lifetime to the
    /// returned guard.
    pub fn register_producer_scoped(&self, generators: Generators) -> ProducerGuard {
        let id = self.produce(generators);
        ProducerGuard::new(Arc::downgrade(&self.inner), id)
    }

    /// Retract every generator registered under `id`. Returns `false` (no-op)
    /// if `id` has no record.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from a released generator's destructor, after every
    /// generator under `id` has been retracted.
    pub fn unregister_producer(&self, id: ProducerId) -> bool {
        let Some((_, record)) = self.inner.producers.remove(&id) else {
            trace!(bus = %self.inner.config.name, producer_id = %id, "Unregister ignored: no record");
            return false;
        };

        let generators = record.len();
        drop(record);
        debug!(
            bus = %self.inner.config.name,
            producer_id = %id,
            generators,
            "Producer unregistered"
        );
        true
    }

    /// Unsubscribe every listener and unregister every producer.
    pub fn clear(&self) {
        let listeners: Vec<ListenerId> = self.inner.listeners.iter().map(|r| *r.key()).collect();
        let producers: Vec<ProducerId> = self.inner.producers.iter().map(|r| *r.key()).collect();

        for id in &listeners {
            self.unsubscribe(*id);
        }
        for id in &producers {
            self.unregister_producer(*id);
        }

        debug!(
            bus = %self.inner.config.name,
            listeners = listeners.len(),
            producers = producers.len(),
            "Bus cleared"
        );
    }

    /// Number of live handlers for event type `E`.
    #[must_use]
    pub fn handler_count<E: 'static>(&self) -> usize {
        self.inner
            .registries
            .get::<E>()
            .map_or(0, |r| r.live_handlers())
    }

    /// Number of live generators for event type `E`.
    #[must_use]
    pub fn generator_count<E: 'static>(&self) -> usize {
        self.inner
            .registries
            .get::<E>()
            .map_or(0, |r| r.live_generators())
    }

    /// Number of listener ids with a record.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Number of producer ids with a record.
    #[must_use]
    pub fn producer_count(&self) -> usize {
        self.inner.producers.len()
    }

    /// Live counts for every event type this bus has seen, sorted by type
    /// name.
    #[must_use]
    pub fn stats(&self) -> Vec<RegistryStats> {
        self.inner.registries.stats()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("name", &self.inner.config.name)
            .field("listeners", &self.inner.listeners.len())
            .field("producers", &self.inner.producers.len())
            .finish_non_exhaustive()
    }
}
