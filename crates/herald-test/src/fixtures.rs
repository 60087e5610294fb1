//! Fixture event types.
//!
//! Three small, unrelated types so tests can exercise per-type routing
//! without declaring their own.

use serde::{Deserialize, Serialize};

/// A temperature reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    /// Degrees Celsius.
    pub celsius: f64,
}

impl Temperature {
    /// Create a reading in degrees Celsius.
    #[must_use]
    pub const fn celsius(celsius: f64) -> Self {
        Self { celsius }
    }
}

/// A pressure reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pressure {
    /// Name of the reporting sensor.
    pub sensor: String,
    /// Hectopascals.
    pub hpa: f64,
}

impl Pressure {
    /// Create a reading from `sensor` in hectopascals.
    #[must_use]
    pub fn new(sensor: impl Into<String>, hpa: f64) -> Self {
        Self {
            sensor: sensor.into(),
            hpa,
        }
    }
}

/// A clock tick carrying a sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tick(pub u64);
