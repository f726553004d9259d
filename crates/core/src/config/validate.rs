use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Processor section exists (enforced by serde)
/// - Processor base URL looks like an HTTP URL
/// - Server port is not 0
/// - Dispatcher pool sizes are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if !config.processor.base_url.starts_with("http://")
        && !config.processor.base_url.starts_with("https://")
    {
        return Err(ConfigError::ValidationError(format!(
            "processor.base_url must be an HTTP URL, got: {}",
            config.processor.base_url
        )));
    }

    if config.dispatcher.workers == 0 {
        return Err(ConfigError::ValidationError(
            "dispatcher.workers cannot be 0".to_string(),
        ));
    }

    if config.dispatcher.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "dispatcher.queue_capacity cannot be 0".to_string(),
        ));
    }

    Ok(())
}
