use std::collections::HashMap;

use tracing::debug;

use crate::types::Config;

/// Overrides the bus name.
pub const ENV_BUS_NAME: &str = "HERALD_BUS_NAME";
/// Overrides the global log level.
pub const ENV_LOG_LEVEL: &str = "HERALD_LOG_LEVEL";
/// Overrides the log format.
pub const ENV_LOG_FORMAT: &str = "HERALD_LOG_FORMAT";

/// Snapshot the `HERALD_*` variables from the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("HERALD_"))
        .collect()
}

/// Apply overrides from `vars` to `config`, returning how many fields changed.
///
/// Empty values are ignored.
pub fn apply_overrides(config: &mut Config, vars: &HashMap<String, String>) -> usize {
    let mut applied: usize = 0;

    let targets: [(&str, &mut String); 3] = [
        (ENV_BUS_NAME, &mut config.bus.name),
        (ENV_LOG_LEVEL, &mut config.logging.level),
        (ENV_LOG_FORMAT, &mut config.logging.format),
    ];

    for (key, field) in targets {
        if let Some(value) = vars.get(key).filter(|v| !v.trim().is_empty()) {
            debug!(var = key, "applying environment override");
            value.trim().clone_into(field);
            applied = applied.saturating_add(1);
        }
    }

    applied
}
