use crate::config::types::{Config, ValidatedKey, API_KEY_ENV};
use crate::config::validation::{validate, validate_key};
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use comment_sleuth::config::load_config;
///
/// let config = load_config(Path::new("sleuth.toml")).unwrap();
/// println!("Database: {}", config.output.database_path);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Resolves the API key for this process
///
/// The environment variable wins over the config file so a key never has to
/// be written to disk. The key is format-checked here, once, and then handed
/// to the crawler as an opaque [`ValidatedKey`].
pub fn resolve_key(config: &Config) -> Result<ValidatedKey, ConfigError> {
    let from_env = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
    resolve_key_from(config, from_env)
}

fn resolve_key_from(config: &Config, from_env: Option<String>) -> Result<ValidatedKey, ConfigError> {
    let key = from_env
        .or_else(|| config.api.key.clone())
        .ok_or(ConfigError::MissingKey(API_KEY_ENV))?;
    validate_key(&key)?;
    Ok(ValidatedKey::new(key))
}
