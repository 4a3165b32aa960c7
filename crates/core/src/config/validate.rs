use std::str::FromStr;

use crate::format::FormatKey;

use super::{types::Config, ConfigError};

/// Validate configuration
///
/// Rejects, before any work starts:
/// - an empty list of source roots
/// - an unparseable candidate mode
/// - media types that are not lossless tracker media
/// - unknown format keys in the supported list
/// - an empty announce URL
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.paths.source_dirs.is_empty() {
        return Err(ConfigError::ValidationError(
            "paths.source_dirs must list at least one directory".to_string(),
        ));
    }

    if config.tracker.announce_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "tracker.announce_url cannot be empty".to_string(),
        ));
    }

    config.selection_mode()?;
    config.media_filter()?;

    for entry in &config.formats.supported {
        if entry.trim().is_empty() {
            continue;
        }
        FormatKey::from_str(entry)
            .map_err(|e| ConfigError::ValidationError(format!("formats.supported: {}", e)))?;
    }

    Ok(())
}
