//! Bus configuration.

use serde::{Deserialize, Serialize};

/// Default threshold above which a single event type's handler count is
/// reported as a probable leak.
pub const DEFAULT_HANDLER_WARN_THRESHOLD: usize = 256;

/// What happens when a handler or generator panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanicPolicy {
    /// Catch the panic, log a warning, and continue with the next callback.
    #[default]
    Isolate,
    /// Let the panic unwind out of `send` / `subscribe`. Registry state is
    /// still restored on the way out.
    Propagate,
}

/// Configuration for an [`EventBus`](crate::EventBus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Label attached to log events emitted by this bus.
    pub name: String,
    /// Panic handling for handlers and generators.
    pub panic_policy: PanicPolicy,
    /// Warn once a single event type has more live handlers than this.
    /// `0` disables the warning.
    pub handler_warn_threshold: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            panic_policy: PanicPolicy::default(),
            handler_warn_threshold: DEFAULT_HANDLER_WARN_THRESHOLD,
        }
    }
}

impl BusConfig {
    /// Create a config with the given bus name and default settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the panic policy.
    #[must_use]
    pub fn with_panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.panic_policy = policy;
        self
    }

    /// Set the handler warning threshold (`0` disables it).
    #[must_use]
    pub fn with_handler_warn_threshold(mut self, threshold: usize) -> Self {
        self.handler_warn_threshold = threshold;
        self
    }
}

#[cfg(feature = "config")]
impl From<&herald_config::BusSection> for BusConfig {
    fn from(section: &herald_config::BusSection) -> Self {
        let panic_policy = match section.panic_policy {
            herald_config::PanicMode::Isolate => PanicPolicy::Isolate,
            herald_config::PanicMode::Propagate => PanicPolicy::Propagate,
        };
        Self {
            name: section.name.clone(),
            panic_policy,
            handler_warn_threshold: section.handler_warn_threshold,
        }
    }
}
