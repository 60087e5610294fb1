//! Herald Events - type-indexed in-process event bus.
//!
//! This crate provides:
//! - An [`EventBus`] keyed by event *type*: any `'static` Rust type is an
//!   event, and a handler is bound to the type of its parameter
//! - Listener records, so one [`ListenerId`] retracts every handler it
//!   registered with a single [`EventBus::unsubscribe`]
//! - Producers, whose generators replay current state to each newly
//!   subscribed handler of the same type
//!
//! # Architecture
//!
//! Every event type gets its own registry with two ordered lists: handlers
//! and generators. [`EventBus::send`] walks the handlers of one type
//! synchronously, in registration order. [`EventBus::subscribe`] installs a
//! [`Handlers`] set and then asks every live generator of each new handler's
//! type for its current value, delivering those values to the new handler
//! only.
//!
//! Handlers may subscribe, unsubscribe, and send from inside a delivery.
//! A handler added during a delivery is not invoked by that delivery; a
//! handler removed during a delivery is not invoked after its removal.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use herald_events::{EventBus, Generators, Handlers};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Temperature(f64);
//!
//! let bus = EventBus::new();
//!
//! // A producer that always knows the latest reading.
//! let latest = Arc::new(Mutex::new(Temperature(18.0)));
//! let source = Arc::clone(&latest);
//! let producer = bus.produce(
//!     Generators::new().yields(move || source.lock().unwrap().clone()),
//! );
//!
//! // A late subscriber is brought up to date immediately.
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let listener = bus.listen(
//!     Handlers::new().on(move |t: &Temperature| sink.lock().unwrap().push(t.0)),
//! );
//! assert_eq!(*seen.lock().unwrap(), vec![18.0]);
//!
//! // Then receives live events.
//! assert_eq!(bus.send(&Temperature(19.5)), 1);
//! assert_eq!(*seen.lock().unwrap(), vec![18.0, 19.5]);
//!
//! bus.unsubscribe(listener);
//! bus.unregister_producer(producer);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod config;
mod guard;
mod handler;
mod id;
mod record;
mod registry;

pub use bus::EventBus;
pub use config::{BusConfig, DEFAULT_HANDLER_WARN_THRESHOLD, PanicPolicy};
pub use guard::{ProducerGuard, Subscription};
pub use handler::{Generators, Handlers};
pub use id::{ListenerId, ProducerId};
pub use registry::RegistryStats;
