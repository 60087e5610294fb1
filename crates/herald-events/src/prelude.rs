//! Prelude module - commonly used types for convenient import.
//!
//! Use `use herald_events::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use herald_events::prelude::*;
//!
//! let bus = EventBus::new();
//! let guard = bus.subscribe_scoped(Handlers::new().on(|_: &u8| {}));
//! assert_eq!(bus.send(&1_u8), 1);
//! drop(guard);
//! assert_eq!(bus.send(&1_u8), 0);
//! ```

// Event bus
pub use crate::{EventBus, RegistryStats};

// Registration
pub use crate::{Generators, Handlers, ListenerId, ProducerGuard, ProducerId, Subscription};

// Configuration
pub use crate::{BusConfig, PanicPolicy};
