//! Prelude module - commonly used test helpers.
//!
//! Use `use herald_test::prelude::*;` in test modules.

pub use crate::{
    CallLog, Pressure, Recorder, Temperature, Tick, init_test_logging, init_test_logging_with,
    test_file,
};
