//! Builders for handler and generator sets.
//!
//! [`Handlers`] and [`Generators`] collect callbacks for any number of event
//! types before they are handed to the bus in one call:
//!
//! ```rust
//! use std::sync::Arc;
//! use herald_events::{EventBus, Handlers};
//!
//! struct Thermostat;
//! impl Thermostat {
//!     fn on_reading(&self, celsius: &f64) { let _ = celsius; }
//!     fn on_mode(&self, mode: &String) { let _ = mode; }
//! }
//!
//! let bus = EventBus::new();
//! let thermostat = Arc::new(Thermostat);
//! let id = bus.listen(
//!     Handlers::new()
//!         .on_member(&thermostat, Thermostat::on_reading)
//!         .on_member(&thermostat, Thermostat::on_mode),
//! );
//! assert_eq!(bus.send(&21.5_f64), 1);
//! bus.unsubscribe(id);
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::record::{Attachment, Detach};
use crate::registry::{Generator, Handler, Registries};

/// Result of installing one callback into its registry.
pub(crate) struct Installed {
    pub(crate) attachment: Box<dyn Detach>,
    /// Replay into the new handler; `None` for generators.
    pub(crate) replay: Option<Box<dyn FnOnce() -> usize>>,
    pub(crate) event_type: &'static str,
}

/// Deferred installation of one callback.
pub(crate) type Install = Box<dyn FnOnce(&Registries) -> Installed>;

/// A set of event handlers, each bound to the event type of its parameter.
#[derive(Default)]
pub struct Handlers {
    pending: Vec<Install>,
}

impl Handlers {
    /// Create an empty handler set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a closure handler for events of type `E`.
    #[must_use]
    pub fn on<E, F>(mut self, handler: F) -> Self
    where
        E: 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let handler: Handler<E> = Arc::new(handler);
        self.pending.push(Box::new(move |registries: &Registries| {
            let registry = registries.get_or_create::<E>();
            let slot = registry.add_handler(handler);
            let replay_from = Arc::clone(&registry);
            Installed {
                attachment: Box::new(Attachment::handler(registry, slot)),
                replay: Some(Box::new(move || replay_from.replay(slot))),
                event_type: type_name::<E>(),
            }
        }));
        self
    }

    /// Add a handler that calls `method` on `target`.
    ///
    /// The handler holds only a weak reference: once every strong reference
    /// to `target` is gone it silently does nothing, so a forgotten
    /// unsubscribe can never reach a destroyed object.
    #[must_use]
    pub fn on_member<C, E, F>(self, target: &Arc<C>, method: F) -> Self
    where
        C: Send + Sync + 'static,
        E: 'static,
        F: Fn(&C, &E) + Send + Sync + 'static,
    {
        let target = Arc::downgrade(target);
        self.on(move |event: &E| {
            if let Some(target) = target.upgrade() {
                method(&target, event);
            }
        })
    }

    /// Number of handlers in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn into_pending(self) -> Vec<Install> {
        self.pending
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("count", &self.pending.len())
            .finish()
    }
}

/// A set of value generators used to replay current state to new handlers.
#[derive(Default)]
pub struct Generators {
    pending: Vec<Install>,
}

impl Generators {
    /// Create an empty generator set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a generator that always has a current value of type `E`.
    #[must_use]
    pub fn yields<E, F>(self, generator: F) -> Self
    where
        E: 'static,
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.yields_optional(move || Some(generator()))
    }

    /// Add a generator that may have no current value (`None` is skipped
    /// during replay).
    #[must_use]
    pub fn yields_optional<E, F>(mut self, generator: F) -> Self
    where
        E: 'static,
        F: Fn() -> Option<E> + Send + Sync + 'static,
    {
        let generator: Generator<E> = Arc::new(generator);
        self.pending.push(Box::new(move |registries: &Registries| {
            let registry = registries.get_or_create::<E>();
            let slot = registry.add_generator(generator);
            Installed {
                attachment: Box::new(Attachment::generator(registry, slot)),
                replay: None,
                event_type: type_name::<E>(),
            }
        }));
        self
    }

    /// Add a generator that calls `method` on `target`. Yields nothing once
    /// `target` has been dropped.
    #[must_use]
    pub fn yields_member<C, E, F>(self, target: &Arc<C>, method: F) -> Self
    where
        C: Send + Sync + 'static,
        E: 'static,
        F: Fn(&C) -> E + Send + Sync + 'static,
    {
        let target = Arc::downgrade(target);
        self.yields_optional(move || target.upgrade().map(|target| method(&target)))
    }

    /// Number of generators in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn into_pending(self) -> Vec<Install> {
        self.pending
    }
}

impl fmt::Debug for Generators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generators")
            .field("count", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusConfig;

    #[test]
    fn test_builders_count_entries() {
        let handlers = Handlers::new().on(|_: &u32| {}).on(|_: &String| {});
        assert_eq!(handlers.len(), 2);
        assert!(!handlers.is_empty());

        let generators = Generators::new().yields(|| 1_u32);
        assert_eq!(generators.len(), 1);
        assert!(Generators::new().is_empty());
    }

    #[test]
    fn test_install_registers_by_parameter_type() {
        let registries = Registries::new(Arc::new(BusConfig::default()));
        let installed: Vec<Installed> = Handlers::new()
            .on(|_: &u32| {})
            .on(|_: &String| {})
            .into_pending()
            .into_iter()
            .map(|install| install(&registries))
            .collect();

        assert_eq!(installed[0].event_type, "u32");
        assert_eq!(installed[1].event_type, type_name::<String>());
        assert!(installed.iter().all(|i| i.replay.is_some()));
        assert_eq!(registries.get::<u32>().unwrap().live_handlers(), 1);
        assert_eq!(registries.get::<String>().unwrap().live_handlers(), 1);
    }

    #[test]
    fn test_member_generator_yields_nothing_after_drop() {
        struct Sensor(u32);

        let registries = Registries::new(Arc::new(BusConfig::default()));
        let sensor = Arc::new(Sensor(7));
        let installed: Vec<Installed> = Generators::new()
            .yields_member(&sensor, |s: &Sensor| s.0)
            .into_pending()
            .into_iter()
            .map(|install| install(&registries))
            .collect();
        assert!(installed[0].replay.is_none());

        let registry = registries.get::<u32>().unwrap();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_in = Arc::clone(&seen);
        let slot = registry.add_handler(Arc::new(move |v: &u32| seen_in.lock().unwrap().push(*v)));

        assert_eq!(registry.replay(slot), 1);
        drop(sensor);
        assert_eq!(registry.replay(slot), 0);
        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }
}
