//! Config file loading.

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load a config from a specific file path.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, is larger
/// than 1 MB, or fails validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let config = parse_str(&content, &path.display().to_string())?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Parse and validate TOML text. `origin` names the source in errors.
pub(crate) fn parse_str(content: &str, origin: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}
