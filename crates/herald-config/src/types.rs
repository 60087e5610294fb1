use serde::{Deserialize, Serialize};

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Event bus behaviour.
    pub bus: BusSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// BusSection
// ---------------------------------------------------------------------------

/// What the bus does when a handler or generator panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanicMode {
    /// Catch the panic, log it, and keep dispatching to the remaining callbacks.
    #[default]
    Isolate,
    /// Let the panic unwind out of the dispatching call.
    Propagate,
}

/// Event bus configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSection {
    /// Label attached to every log event emitted by the bus.
    pub name: String,
    /// Panic handling for handlers and generators.
    pub panic_policy: PanicMode,
    /// Log a warning once a single event type has more live handlers than
    /// this. `0` disables the warning.
    pub handler_warn_threshold: usize,
}

impl Default for BusSection {
    fn default() -> Self {
        Self {
            name: "default".to_owned(),
            panic_policy: PanicMode::default(),
            handler_warn_threshold: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"` (human-friendly), `"compact"` (one-line),
    /// `"json"` (structured), or `"full"` (verbose).
    pub format: String,
    /// Per-crate tracing directives (e.g. `["herald_events=trace"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
