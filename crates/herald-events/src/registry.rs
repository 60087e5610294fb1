//! Per-event-type handler and generator storage.
//!
//! A [`TypeRegistry<E>`] keeps two ordered slot lists for one event type:
//! handlers (`Fn(&E)`) and generators (`Fn() -> Option<E>`).
//!
//! ## Iteration discipline
//! - A pass (dispatch or replay) records `end = len` and bumps the side's
//!   depth counter before invoking anything.
//! - While depth > 0, slots are only appended or replaced with `None`; live
//!   slots never move, so index `i` names the same registration for the
//!   whole pass.
//! - Tombstones are compacted when the outermost pass ends, or immediately on
//!   removal when no pass is running.
//! - The depth counter counts passes from every thread. While passes on other
//!   threads keep overlapping, tombstones accumulate; the removed callables
//!   are already dropped, only their empty slots remain until depth reaches
//!   zero.
//! - The mutex is released before any callback runs and re-acquired per slot,
//!   so callbacks may re-enter the bus.

use std::any::{Any, TypeId, type_name};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::{BusConfig, PanicPolicy};

/// Type-erased event handler.
pub(crate) type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Type-erased value generator. `None` means "nothing to replay right now".
pub(crate) type Generator<E> = Arc<dyn Fn() -> Option<E> + Send + Sync>;

/// Registry-local slot handle. Never reused within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotId(u64);

/// Which slot list a pass or attachment refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Handlers,
    Generators,
}

/// Ordered slots with tombstoning.
struct Slots<F: ?Sized> {
    entries: Vec<Option<(SlotId, Arc<F>)>>,
    depth: usize,
    tombstones: usize,
}

impl<F: ?Sized> Default for Slots<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            depth: 0,
            tombstones: 0,
        }
    }
}

impl<F: ?Sized> Slots<F> {
    fn push(&mut self, slot: SlotId, callable: Arc<F>) {
        self.entries.push(Some((slot, callable)));
    }

    /// Tombstone `slot` and hand back its callable, or `None` if unknown.
    fn remove(&mut self, slot: SlotId) -> Option<Arc<F>> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| matches!(e, Some((id, _)) if *id == slot))?;
        let (_, callable) = entry.take()?;
        self.tombstones = self.tombstones.saturating_add(1);

        if self.depth == 0 {
            self.compact();
        }
        Some(callable)
    }

    fn get(&self, index: usize) -> Option<Arc<F>> {
        self.entries
            .get(index)?
            .as_ref()
            .map(|(_, callable)| Arc::clone(callable))
    }

    fn find(&self, slot: SlotId) -> Option<Arc<F>> {
        self.entries
            .iter()
            .flatten()
            .find(|(id, _)| *id == slot)
            .map(|(_, callable)| Arc::clone(callable))
    }

    /// Start a pass; returns the exclusive upper bound of indices it visits.
    fn begin_pass(&mut self) -> usize {
        self.depth = self.depth.saturating_add(1);
        self.entries.len()
    }

    fn end_pass(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 && self.tombstones > 0 {
            self.compact();
        }
    }

    fn compact(&mut self) {
        self.entries.retain(Option::is_some);
        self.tombstones = 0;
    }

    fn live(&self) -> usize {
        self.entries.len().saturating_sub(self.tombstones)
    }
}

struct State<E: 'static> {
    handlers: Slots<dyn Fn(&E) + Send + Sync>,
    generators: Slots<dyn Fn() -> Option<E> + Send + Sync>,
    next_slot: u64,
}

impl<E: 'static> State<E> {
    fn allocate(&mut self) -> SlotId {
        let slot = SlotId(self.next_slot);
        self.next_slot = self.next_slot.wrapping_add(1);
        slot
    }
}

/// Handlers and generators for one event type.
pub(crate) struct TypeRegistry<E: 'static> {
    state: Mutex<State<E>>,
    config: Arc<BusConfig>,
}

impl<E: 'static> TypeRegistry<E> {
    pub(crate) fn new(config: Arc<BusConfig>) -> Self {
        Self {
            state: Mutex::new(State {
                handlers: Slots::default(),
                generators: Slots::default(),
                next_slot: 0,
            }),
            config,
        }
    }

    // Callbacks never run under this lock, so a poisoned state is still
    // consistent.
    fn lock(&self) -> MutexGuard<'_, State<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn add_handler(&self, handler: Handler<E>) -> SlotId {
        let (slot, live) = {
            let mut state = self.lock();
            let slot = state.allocate();
            state.handlers.push(slot, handler);
            (slot, state.handlers.live())
        };

        let threshold = self.config.handler_warn_threshold;
        if threshold > 0 && live == threshold.saturating_add(1) {
            warn!(
                bus = %self.config.name,
                event_type = type_name::<E>(),
                handlers = live,
                threshold,
                "Handler count exceeds threshold; listeners may not be unsubscribing"
            );
        }
        slot
    }

    /// The returned handler must be dropped by the caller, outside the lock.
    pub(crate) fn remove_handler(&self, slot: SlotId) -> Option<Handler<E>> {
        self.lock().handlers.remove(slot)
    }

    pub(crate) fn add_generator(&self, generator: Generator<E>) -> SlotId {
        let mut state = self.lock();
        let slot = state.allocate();
        state.generators.push(slot, generator);
        slot
    }

    /// The returned generator must be dropped by the caller, outside the lock.
    pub(crate) fn remove_generator(&self, slot: SlotId) -> Option<Generator<E>> {
        self.lock().generators.remove(slot)
    }

    /// Invoke every handler registered before this call, in registration
    /// order. Returns the number of handlers that ran to completion.
    pub(crate) fn send(&self, event: &E) -> usize {
        let end = self.lock().handlers.begin_pass();
        let _pass = Pass {
            registry: self,
            side: Side::Handlers,
        };

        let mut delivered: usize = 0;
        for index in 0..end {
            let Some(handler) = self.lock().handlers.get(index) else {
                continue;
            };
            if self.invoke("handler", || handler(event)).is_some() {
                delivered = delivered.saturating_add(1);
            }
        }
        delivered
    }

    /// Deliver the current value of every live generator to the handler in
    /// `slot` only. Returns the number of deliveries.
    pub(crate) fn replay(&self, slot: SlotId) -> usize {
        let end = self.lock().generators.begin_pass();
        let _pass = Pass {
            registry: self,
            side: Side::Generators,
        };

        let mut delivered: usize = 0;
        for index in 0..end {
            // The target may have been unsubscribed by an earlier delivery.
            if self.lock().handlers.find(slot).is_none() {
                break;
            }
            let Some(generator) = self.lock().generators.get(index) else {
                continue;
            };
            let Some(value) = self.invoke("generator", || generator()).flatten() else {
                continue;
            };
            let Some(handler) = self.lock().handlers.find(slot) else {
                break;
            };
            if self.invoke("handler", || handler(&value)).is_some() {
                delivered = delivered.saturating_add(1);
                trace!(
                    bus = %self.config.name,
                    event_type = type_name::<E>(),
                    generator_index = index,
                    "Replayed producer value"
                );
            }
        }
        delivered
    }

    pub(crate) fn live_handlers(&self) -> usize {
        self.lock().handlers.live()
    }

    pub(crate) fn live_generators(&self) -> usize {
        self.lock().generators.live()
    }

    /// Run a callback under the configured panic policy. `None` means it
    /// panicked and the panic was isolated.
    fn invoke<R>(&self, role: &'static str, f: impl FnOnce() -> R) -> Option<R> {
        match self.config.panic_policy {
            PanicPolicy::Propagate => Some(f()),
            PanicPolicy::Isolate => match catch_unwind(AssertUnwindSafe(f)) {
                Ok(value) => Some(value),
                Err(payload) => {
                    warn!(
                        bus = %self.config.name,
                        event_type = type_name::<E>(),
                        role,
                        panic = panic_message(payload.as_ref()),
                        "Callback panicked"
                    );
                    None
                },
            },
        }
    }
}

/// Ends a pass on drop, so unwinding out of a callback still restores the
/// depth counter.
struct Pass<'a, E: 'static> {
    registry: &'a TypeRegistry<E>,
    side: Side,
}

impl<E: 'static> Drop for Pass<'_, E> {
    fn drop(&mut self) {
        let mut state = self.registry.lock();
        match self.side {
            Side::Handlers => state.handlers.end_pass(),
            Side::Generators => state.generators.end_pass(),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Live counts for one event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Rust type name of the event.
    pub event_type: String,
    /// Number of live handlers.
    pub handlers: usize,
    /// Number of live generators.
    pub generators: usize,
}

/// Object-safe view of a `TypeRegistry<E>` for the type map.
trait ErasedRegistry: Send + Sync {
    fn stats(&self) -> RegistryStats;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<E: 'static> ErasedRegistry for TypeRegistry<E> {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn stats(&self) -> RegistryStats {
        let state = self.lock();
        RegistryStats {
            event_type: type_name::<E>().to_string(),
            handlers: state.handlers.live(),
            generators: state.generators.live(),
        }
    }
}

/// `TypeId` → registry map owned by one bus.
pub(crate) struct Registries {
    map: DashMap<TypeId, Arc<dyn ErasedRegistry>>,
    config: Arc<BusConfig>,
}

impl Registries {
    pub(crate) fn new(config: Arc<BusConfig>) -> Self {
        Self {
            map: DashMap::new(),
            config,
        }
    }

    /// Look up the registry for `E` without creating it.
    pub(crate) fn get<E: 'static>(&self) -> Option<Arc<TypeRegistry<E>>> {
        let erased = Arc::clone(self.map.get(&TypeId::of::<E>())?.value());
        downcast(erased)
    }

    pub(crate) fn get_or_create<E: 'static>(&self) -> Arc<TypeRegistry<E>> {
        if let Some(existing) = self.get::<E>() {
            return existing;
        }

        let created = Arc::new(TypeRegistry::<E>::new(Arc::clone(&self.config)));
        let erased = match self.map.entry(TypeId::of::<E>()) {
            Entry::Occupied(occupied) => Arc::clone(occupied.get()),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&created) as Arc<dyn ErasedRegistry>);
                trace!(
                    bus = %self.config.name,
                    event_type = type_name::<E>(),
                    "Created type registry"
                );
                return created;
            },
        };
        // Lost a race with another creator; use theirs.
        downcast(erased).unwrap_or(created)
    }

    /// Stats for every registry, sorted by event type name.
    pub(crate) fn stats(&self) -> Vec<RegistryStats> {
        let registries: Vec<Arc<dyn ErasedRegistry>> =
            self.map.iter().map(|r| Arc::clone(r.value())).collect();
        let mut stats: Vec<RegistryStats> = registries.iter().map(|r| r.stats()).collect();
        stats.sort_by(|a, b| a.event_type.cmp(&b.event_type));
        stats
    }
}

fn downcast<E: 'static>(erased: Arc<dyn ErasedRegistry>) -> Option<Arc<TypeRegistry<E>>> {
    erased.into_any().downcast::<TypeRegistry<E>>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry<E: 'static>() -> TypeRegistry<E> {
        TypeRegistry::new(Arc::new(BusConfig::default()))
    }

    fn recording(log: &Arc<StdMutex<Vec<String>>>, label: &str) -> Handler<u32> {
        let log = Arc::clone(log);
        let label = label.to_string();
        Arc::new(move |v: &u32| log.lock().unwrap().push(format!("{label}:{v}")))
    }

    #[test]
    fn test_send_in_registration_order() {
        let reg = registry::<u32>();
        let log = Arc::new(StdMutex::new(Vec::new()));
        reg.add_handler(recording(&log, "a"));
        reg.add_handler(recording(&log, "b"));
        reg.add_handler(recording(&log, "c"));

        assert_eq!(reg.send(&7), 3);
        assert_eq!(*log.lock().unwrap(), vec!["a:7", "b:7", "c:7"]);
    }

    #[test]
    fn test_remove_outside_pass_compacts_immediately() {
        let reg = registry::<u32>();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let a = reg.add_handler(recording(&log, "a"));
        reg.add_handler(recording(&log, "b"));

        assert!(reg.remove_handler(a).is_some());
        assert_eq!(reg.lock().handlers.entries.len(), 1);
        assert_eq!(reg.live_handlers(), 1);

        reg.send(&1);
        assert_eq!(*log.lock().unwrap(), vec!["b:1"]);
    }

    #[test]
    fn test_remove_unknown_slot_is_noop() {
        let reg = registry::<u32>();
        assert!(reg.remove_handler(SlotId(42)).is_none());
        assert!(reg.remove_generator(SlotId(42)).is_none());
        assert_eq!(reg.live_handlers(), 0);
    }

    #[test]
    fn test_double_remove_returns_none() {
        let reg = registry::<u32>();
        let slot = reg.add_handler(Arc::new(|_: &u32| {}));
        assert!(reg.remove_handler(slot).is_some());
        assert!(reg.remove_handler(slot).is_none());
    }

    #[test]
    fn test_removal_during_pass_tombstones_until_pass_ends() {
        let reg = Arc::new(registry::<u32>());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let victim: Arc<StdMutex<Option<SlotId>>> = Arc::new(StdMutex::new(None));

        let reg_in = Arc::clone(&reg);
        let victim_in = Arc::clone(&victim);
        let log_in = Arc::clone(&log);
        reg.add_handler(Arc::new(move |v: &u32| {
            log_in.lock().unwrap().push(format!("remover:{v}"));
            let slot = victim_in.lock().unwrap().take();
            if let Some(slot) = slot {
                drop(reg_in.remove_handler(slot));
                // Still inside the pass: the slot is a tombstone, not gone.
                let state = reg_in.lock();
                assert_eq!(state.handlers.entries.len(), 3);
                assert_eq!(state.handlers.live(), 2);
            }
        }));
        let b = reg.add_handler(recording(&log, "b"));
        reg.add_handler(recording(&log, "c"));
        *victim.lock().unwrap() = Some(b);

        assert_eq!(reg.send(&5), 2);
        assert_eq!(*log.lock().unwrap(), vec!["remover:5", "c:5"]);
        assert_eq!(reg.lock().handlers.entries.len(), 2);
    }

    #[test]
    fn test_append_during_pass_not_visited() {
        let reg = Arc::new(registry::<u32>());
        let log = Arc::new(StdMutex::new(Vec::new()));

        let reg_in = Arc::clone(&reg);
        let log_in = Arc::clone(&log);
        reg.add_handler(Arc::new(move |v: &u32| {
            log_in.lock().unwrap().push(format!("adder:{v}"));
            reg_in.add_handler(recording(&log_in, "late"));
        }));

        reg.send(&1);
        assert_eq!(*log.lock().unwrap(), vec!["adder:1"]);

        reg.send(&2);
        assert_eq!(*log.lock().unwrap(), vec!["adder:1", "adder:2", "late:2"]);
    }

    #[test]
    fn test_pass_on_other_thread_defers_compaction() {
        use std::sync::Barrier;
        use std::thread;

        let reg = Arc::new(registry::<u32>());
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let (entered_in, release_in) = (Arc::clone(&entered), Arc::clone(&release));
        reg.add_handler(Arc::new(move |_: &u32| {
            entered_in.wait();
            release_in.wait();
        }));
        let victim = reg.add_handler(Arc::new(|_: &u32| {}));

        let reg_in = Arc::clone(&reg);
        let sender = thread::spawn(move || reg_in.send(&1));

        entered.wait();
        drop(reg.remove_handler(victim));
        {
            let state = reg.lock();
            assert_eq!(state.handlers.entries.len(), 2);
            assert_eq!(state.handlers.live(), 1);
        }
        release.wait();

        // The tombstone is skipped by the in-flight pass and compacted when
        // it ends.
        assert_eq!(sender.join().unwrap(), 1);
        assert_eq!(reg.lock().handlers.entries.len(), 1);
    }

    #[test]
    fn test_replay_targets_single_handler() {
        let reg = registry::<u32>();
        let log = Arc::new(StdMutex::new(Vec::new()));
        reg.add_generator(Arc::new(|| Some(10)));
        reg.add_generator(Arc::new(|| None));
        reg.add_generator(Arc::new(|| Some(20)));

        reg.add_handler(recording(&log, "old"));
        let new = reg.add_handler(recording(&log, "new"));

        assert_eq!(reg.replay(new), 2);
        assert_eq!(*log.lock().unwrap(), vec!["new:10", "new:20"]);
    }

    #[test]
    fn test_replay_for_removed_handler_delivers_nothing() {
        let reg = registry::<u32>();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = Arc::clone(&calls);
        reg.add_generator(Arc::new(move || {
            calls_in.fetch_add(1, Ordering::SeqCst);
            Some(1)
        }));
        let slot = reg.add_handler(Arc::new(|_: &u32| {}));
        drop(reg.remove_handler(slot));

        assert_eq!(reg.replay(slot), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_isolated_panic_skips_only_that_handler() {
        let reg = registry::<u32>();
        let log = Arc::new(StdMutex::new(Vec::new()));
        reg.add_handler(Arc::new(|_: &u32| panic!("boom")));
        reg.add_handler(recording(&log, "after"));

        assert_eq!(reg.send(&3), 1);
        assert_eq!(*log.lock().unwrap(), vec!["after:3"]);
        assert_eq!(reg.lock().handlers.depth, 0);
    }

    #[test]
    fn test_propagated_panic_restores_depth() {
        let config = BusConfig::default().with_panic_policy(PanicPolicy::Propagate);
        let reg = Arc::new(TypeRegistry::<u32>::new(Arc::new(config)));
        reg.add_handler(Arc::new(|_: &u32| panic!("boom")));

        let reg_in = Arc::clone(&reg);
        let result = catch_unwind(AssertUnwindSafe(move || reg_in.send(&1)));
        assert!(result.is_err());
        assert_eq!(reg.lock().handlers.depth, 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(5_i32);

        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "<non-string panic payload>");
    }

    #[test]
    fn test_registries_are_per_type() {
        let regs = Registries::new(Arc::new(BusConfig::default()));
        assert!(regs.get::<u32>().is_none());

        let a = regs.get_or_create::<u32>();
        let b = regs.get_or_create::<u32>();
        assert!(Arc::ptr_eq(&a, &b));

        regs.get_or_create::<String>();
        a.add_handler(Arc::new(|_: &u32| {}));

        let stats = regs.stats();
        assert_eq!(stats.len(), 2);
        let u32_stats = stats.iter().find(|s| s.event_type == "u32").unwrap();
        assert_eq!(u32_stats.handlers, 1);
        assert_eq!(u32_stats.generators, 0);
    }
}
