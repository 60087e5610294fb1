//! Integration tests for listener and producer lifetimes.

use std::panic::{AssertUnwindSafe, catch_unwind};

use herald_events::{BusConfig, EventBus, Generators, Handlers, ListenerId, ProducerId};
use herald_test::{Pressure, Recorder, Temperature, Tick};

struct PanicOnDrop;

impl Drop for PanicOnDrop {
    fn drop(&mut self) {
        panic!("destructor failure");
    }
}

#[test]
fn test_unsubscribe_retracts_every_handler() {
    let bus = EventBus::new();
    let ticks = Recorder::<Tick>::new();
    let temperatures = Recorder::<Temperature>::new();

    let id = bus.listen(
        Handlers::new()
            .on(ticks.handler())
            .on(temperatures.handler()),
    );
    bus.send(&Tick(1));
    assert!(bus.unsubscribe(id));

    assert_eq!(bus.send(&Tick(2)), 0);
    assert_eq!(bus.send(&Temperature::celsius(1.0)), 0);
    assert_eq!(ticks.values(), vec![Tick(1)]);
    assert!(temperatures.is_empty());
    assert_eq!(bus.listener_count(), 0);
}

#[test]
fn test_unregister_retracts_every_generator() {
    let bus = EventBus::new();
    let id = bus.produce(
        Generators::new()
            .yields(|| Tick(1))
            .yields(|| Pressure::new("a", 1.0)),
    );
    assert!(bus.unregister_producer(id));

    let ticks = Recorder::<Tick>::new();
    let pressures = Recorder::<Pressure>::new();
    bus.listen(Handlers::new().on(ticks.handler()).on(pressures.handler()));

    assert!(ticks.is_empty());
    assert!(pressures.is_empty());
    assert_eq!(bus.producer_count(), 0);
}

#[test]
fn test_teardown_is_idempotent() {
    let bus = EventBus::new();
    let listener = bus.listen(Handlers::new().on(|_: &Tick| {}));
    let producer = bus.produce(Generators::new().yields(|| Tick(0)));

    assert!(bus.unsubscribe(listener));
    assert!(!bus.unsubscribe(listener));
    assert!(bus.unregister_producer(producer));
    assert!(!bus.unregister_producer(producer));

    // Ids that were never used are equally harmless.
    assert!(!bus.unsubscribe(ListenerId::new()));
    assert!(!bus.unregister_producer(ProducerId::new()));
}

#[test]
fn test_reused_listener_id_extends_record() {
    let bus = EventBus::new();
    let id = ListenerId::new();
    let ticks = Recorder::<Tick>::new();

    assert_eq!(bus.subscribe(id, Handlers::new().on(ticks.handler())), id);
    bus.subscribe(id, Handlers::new().on(ticks.handler()));

    assert_eq!(bus.listener_count(), 1);
    assert_eq!(bus.send(&Tick(1)), 2);

    bus.unsubscribe(id);
    assert_eq!(bus.handler_count::<Tick>(), 0);
}

#[test]
fn test_reused_producer_id_extends_record() {
    let bus = EventBus::new();
    let id = ProducerId::new();
    bus.register_producer(id, Generators::new().yields(|| Tick(1)));
    bus.register_producer(id, Generators::new().yields(|| Tick(2)));
    assert_eq!(bus.producer_count(), 1);
    assert_eq!(bus.generator_count::<Tick>(), 2);

    bus.unregister_producer(id);
    assert_eq!(bus.generator_count::<Tick>(), 0);
}

#[test]
fn test_scoped_guards_release_on_drop() {
    let bus = EventBus::new();
    let ticks = Recorder::<Tick>::new();

    {
        let _producer = bus.register_producer_scoped(Generators::new().yields(|| Tick(7)));
        let _subscription = bus.subscribe_scoped(Handlers::new().on(ticks.handler()));
        assert_eq!(ticks.values(), vec![Tick(7)]);
        assert_eq!(bus.send(&Tick(8)), 1);
    }

    assert_eq!(bus.send(&Tick(9)), 0);
    assert_eq!(bus.listener_count(), 0);
    assert_eq!(bus.producer_count(), 0);
    assert_eq!(ticks.values(), vec![Tick(7), Tick(8)]);
}

#[test]
fn test_clear_then_reuse() {
    let bus = EventBus::new();
    let ticks = Recorder::<Tick>::new();
    bus.listen(Handlers::new().on(ticks.handler()));
    bus.produce(Generators::new().yields(|| Tick(1)));
    bus.clear();

    assert_eq!(bus.send(&Tick(2)), 0);
    assert!(ticks.is_empty());

    bus.listen(Handlers::new().on(ticks.handler()));
    assert_eq!(bus.send(&Tick(3)), 1);
    assert_eq!(ticks.values(), vec![Tick(3)]);
}

#[test]
fn test_stats_track_live_counts() {
    let bus = EventBus::new();
    let a = bus.listen(Handlers::new().on(|_: &Tick| {}).on(|_: &Pressure| {}));
    bus.listen(Handlers::new().on(|_: &Tick| {}));
    bus.produce(Generators::new().yields(|| Tick(0)));

    let stats = bus.stats();
    assert_eq!(stats.len(), 2);
    let ticks = stats
        .iter()
        .find(|s| s.event_type.ends_with("Tick"))
        .unwrap();
    assert_eq!((ticks.handlers, ticks.generators), (2, 1));

    bus.unsubscribe(a);
    assert_eq!(bus.handler_count::<Tick>(), 1);
    assert_eq!(bus.handler_count::<Pressure>(), 0);
    // Registries outlive their last handler.
    assert_eq!(bus.stats().len(), 2);
}

#[test]
fn test_handler_warn_threshold_does_not_limit_registration() {
    let bus = EventBus::with_config(BusConfig::new("leaky").with_handler_warn_threshold(2));
    for _ in 0..5 {
        bus.listen(Handlers::new().on(|_: &Tick| {}));
    }
    assert_eq!(bus.handler_count::<Tick>(), 5);
    assert_eq!(bus.send(&Tick(0)), 5);
}

#[test]
fn test_global_bus_is_process_wide() {
    struct GlobalOnly(u8);

    let seen = Recorder::<u8>::new();
    let record = seen.handler();
    let guard = EventBus::global()
        .subscribe_scoped(Handlers::new().on(move |e: &GlobalOnly| record(&e.0)));

    assert_eq!(EventBus::global().send(&GlobalOnly(4)), 1);
    drop(guard);
    assert_eq!(EventBus::global().send(&GlobalOnly(5)), 0);
    assert_eq!(seen.values(), vec![4]);
}

#[test]
fn test_unsubscribe_is_total_when_a_destructor_panics() {
    let bus = EventBus::new();
    let ticks = Recorder::<Tick>::new();
    let guard = PanicOnDrop;

    let id = bus.listen(
        Handlers::new()
            .on(move |_: &Tick| {
                let _ = &guard;
            })
            .on(ticks.handler()),
    );
    assert_eq!(bus.handler_count::<Tick>(), 2);

    let result = catch_unwind(AssertUnwindSafe(|| bus.unsubscribe(id)));
    assert!(result.is_err());

    assert_eq!(bus.listener_count(), 0);
    assert_eq!(bus.handler_count::<Tick>(), 0);
    assert_eq!(bus.send(&Tick(1)), 0);
    assert!(ticks.is_empty());
}

#[test]
fn test_unregister_is_total_when_a_destructor_panics() {
    let bus = EventBus::new();
    let guard = PanicOnDrop;
    let id = bus.produce(
        Generators::new()
            .yields(move || {
                let _ = &guard;
                Tick(1)
            })
            .yields(|| Tick(2)),
    );

    let result = catch_unwind(AssertUnwindSafe(|| bus.unregister_producer(id)));
    assert!(result.is_err());
    assert_eq!(bus.generator_count::<Tick>(), 0);

    let ticks = Recorder::<Tick>::new();
    bus.listen(Handlers::new().on(ticks.handler()));
    assert!(ticks.is_empty());
}
