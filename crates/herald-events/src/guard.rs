//! Scoped registration guards.

use std::sync::{Arc, Weak};

use crate::bus::{BusInner, EventBus};
use crate::id::{ListenerId, ProducerId};

/// Unsubscribes its listener when dropped.
///
/// Holds only a weak reference to the bus, so a guard that outlives its bus
/// is harmless.
#[must_use = "dropping a Subscription immediately unsubscribes its handlers"]
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<BusInner>,
    id: ListenerId,
    armed: bool,
}

impl Subscription {
    pub(crate) fn new(bus: Weak<BusInner>, id: ListenerId) -> Self {
        Self {
            bus,
            id,
            armed: true,
        }
    }

    /// The listener id this guard owns.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Unsubscribe now. Returns `false` if the listener was already gone.
    pub fn cancel(mut self) -> bool {
        self.armed = false;
        release(&self.bus, |bus| bus.unsubscribe(self.id))
    }

    /// Disarm the guard and hand back the id; the handlers stay registered
    /// until [`EventBus::unsubscribe`] is called.
    pub fn into_id(mut self) -> ListenerId {
        self.armed = false;
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.armed {
            release(&self.bus, |bus| bus.unsubscribe(self.id));
        }
    }
}

/// Unregisters its producer when dropped.
#[must_use = "dropping a ProducerGuard immediately unregisters its generators"]
#[derive(Debug)]
pub struct ProducerGuard {
    bus: Weak<BusInner>,
    id: ProducerId,
    armed: bool,
}

impl ProducerGuard {
    pub(crate) fn new(bus: Weak<BusInner>, id: ProducerId) -> Self {
        Self {
            bus,
            id,
            armed: true,
        }
    }

    /// The producer id this guard owns.
    #[must_use]
    pub fn id(&self) -> ProducerId {
        self.id
    }

    /// Unregister now. Returns `false` if the producer was already gone.
    pub fn cancel(mut self) -> bool {
        self.armed = false;
        release(&self.bus, |bus| bus.unregister_producer(self.id))
    }

    /// Disarm the guard and hand back the id.
    pub fn into_id(mut self) -> ProducerId {
        self.armed = false;
        self.id
    }
}

impl Drop for ProducerGuard {
    fn drop(&mut self) {
        if self.armed {
            release(&self.bus, |bus| bus.unregister_producer(self.id));
        }
    }
}

fn release(bus: &Weak<BusInner>, f: impl FnOnce(&EventBus) -> bool) -> bool {
    bus.upgrade()
        .is_some_and(|inner: Arc<BusInner>| f(&EventBus { inner }))
}
