#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the Herald event dispatcher.
//!
//! A single [`Config`] value holds the `[bus]` and `[logging]` sections of a
//! `herald.toml` file. Every field has a default, so an empty file (or no
//! file at all) is a valid configuration.
//!
//! # Usage
//!
//! ```rust,no_run
//! use herald_config::Config;
//!
//! # fn main() -> herald_config::ConfigResult<()> {
//! let mut config = Config::load_file(std::path::Path::new("herald.toml"))?;
//! config.apply_env_overrides()?;
//! println!("bus name: {}", config.bus.name);
//! # Ok(())
//! # }
//! ```
//!
//! # Environment overrides
//!
//! `HERALD_BUS_NAME`, `HERALD_LOG_LEVEL` and `HERALD_LOG_FORMAT` replace the
//! corresponding file values when set and non-empty. The result is validated
//! again, so a bad override is reported with the field it landed in.
//!
//! # Design
//!
//! This crate has no dependencies on other herald crates. Conversion into
//! domain types (`herald_events::BusConfig`, `herald_telemetry::LogConfig`)
//! lives behind the `config` feature of those crates.

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Parse and validate a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text is not valid TOML, does not match
    /// the configuration schema, or fails validation.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::parse_str(content, "<inline>")
    }

    /// Load configuration from a single file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Apply `HERALD_*` environment variable overrides in place, then
    /// re-validate.
    ///
    /// Returns the number of fields that were overridden.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override leaves the
    /// configuration invalid (e.g. `HERALD_LOG_LEVEL=loud`).
    pub fn apply_env_overrides(&mut self) -> ConfigResult<usize> {
        self.apply_env_overrides_from(&env::collect_env_vars())
    }

    /// Apply overrides from an explicit variable map, then re-validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the overridden
    /// configuration fails validation.
    pub fn apply_env_overrides_from(
        &mut self,
        vars: &std::collections::HashMap<String, String>,
    ) -> ConfigResult<usize> {
        let applied = env::apply_overrides(self, vars);
        validate::validate(self)?;
        Ok(applied)
    }
}
