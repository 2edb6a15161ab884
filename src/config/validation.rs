use crate::config::types::{ApiConfig, Config, OutputConfig, QueueConfig, ScanConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_queue_config(&config.queue)?;
    validate_scan_config(&config.scan)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates remote API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if let Some(key) = &config.key {
        validate_key(key)?;
    }

    Ok(())
}

/// Validates request pacing
fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    if config.min_interval_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "min-interval-ms must be >= 1, got {}",
            config.min_interval_ms
        )));
    }

    Ok(())
}

/// Validates scan tuning
fn validate_scan_config(config: &ScanConfig) -> Result<(), ConfigError> {
    if config.promising_score > 100 {
        return Err(ConfigError::Validation(format!(
            "promising-score must be between 0 and 100, got {}",
            config.promising_score
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Format check for an API key: non-empty, no whitespace
pub fn validate_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty() {
        return Err(ConfigError::Validation("API key cannot be empty".to_string()));
    }

    if key.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "API key must not contain whitespace".to_string(),
        ));
    }

    Ok(())
}
