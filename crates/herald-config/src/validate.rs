//! Configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Accepted global log levels.
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Accepted log output formats.
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_bus(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_bus(config: &Config) -> ConfigResult<()> {
    if config.bus.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "bus.name".to_owned(),
            message: "bus name must not be empty".to_owned(),
        });
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !LOG_LEVELS.contains(&l.level.to_ascii_lowercase().as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unknown level '{}'; expected one of: {}",
                l.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if !LOG_FORMATS.contains(&l.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unknown format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        });
    }

    for (i, directive) in l.directives.iter().enumerate() {
        if directive.trim().is_empty() || directive.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError {
                field: format!("logging.directives[{i}]"),
                message: format!("malformed directive '{directive}'"),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_bus_name_rejected() {
        let mut config = Config::default();
        config.bus.name = "  ".to_owned();

        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "bus.name"));
    }

    #[test]
    fn test_level_is_case_insensitive() {
        let mut config = Config::default();
        config.logging.level = "DEBUG".to_owned();
        assert!(validate(&config).is_ok());

        config.logging.level = "verbose".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();

        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }

    #[test]
    fn test_malformed_directive_rejected() {
        let mut config = Config::default();
        config.logging.directives = vec!["herald_events=trace".to_owned(), "a b".to_owned()];

        let err = validate(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { ref field, .. } if field == "logging.directives[1]")
        );
    }
}
