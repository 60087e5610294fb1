//! Herald Test - Shared test utilities for the Herald crates.
//!
//! This crate provides recording handlers, fixture event types, and test
//! harness helpers that can be used across Herald crates as a
//! dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! herald-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use herald_events::{EventBus, Handlers};
//! use herald_test::{Recorder, Temperature};
//!
//! #[test]
//! fn test_delivery() {
//!     let bus = EventBus::new();
//!     let recorder = Recorder::<Temperature>::new();
//!     bus.listen(Handlers::new().on(recorder.handler()));
//!
//!     bus.send(&Temperature::celsius(20.0));
//!     assert_eq!(recorder.values(), vec![Temperature::celsius(20.0)]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod recorder;

pub use fixtures::*;
pub use harness::*;
pub use recorder::*;
