//! Configuration validation utilities.

use ratrelay_core::{RetryConfig, Target};

use super::error::{ConfigError, ConfigResult};
use super::schema::{ApiConfig, LogOutput, LoggingConfig, RelayConfig, SocketConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &RelayConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_socket_config(&config.socket)?;
    validate_api_config(&config.api)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if let Some(target) = logging.filters.keys().find(|t| t.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter target: {target:?}"
        )));
    }

    Ok(())
}

/// Validates the stream connection settings.
fn validate_socket_config(socket: &SocketConfig) -> ConfigResult<()> {
    if socket.url.trim().is_empty() {
        return Err(ConfigError::missing_field("socket.url"));
    }

    if socket.port == Some(0) {
        return Err(ConfigError::InvalidPort(0));
    }

    Target::from_url(&socket.url, socket.port)
        .map_err(|e| ConfigError::invalid_url(&socket.url, e.to_string()))?;

    if socket.bearer.trim().is_empty() {
        return Err(ConfigError::missing_field("socket.bearer"));
    }

    if socket.application_id.trim().is_empty() {
        return Err(ConfigError::missing_field("socket.application_id"));
    }

    validate_retry_config(&socket.retry)?;

    Ok(())
}

/// Validates retry configuration.
fn validate_retry_config(retry: &RetryConfig) -> ConfigResult<()> {
    if retry.initial_delay.is_zero() {
        return Err(ConfigError::validation(
            "Initial retry delay must be greater than 0",
        ));
    }

    if retry.max_delay < retry.initial_delay {
        return Err(ConfigError::validation(
            "Max retry delay must be greater than or equal to initial delay",
        ));
    }

    if !retry.multiplier.is_finite() || retry.multiplier < 1.0 {
        return Err(ConfigError::validation(
            "Backoff multiplier must be at least 1.0",
        ));
    }

    Ok(())
}

/// Validates the rescue API settings.
fn validate_api_config(api: &ApiConfig) -> ConfigResult<()> {
    let Some(url) = api.url.as_deref().filter(|_| api.is_enabled()) else {
        return Ok(());
    };

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }

    if api.timeout.is_zero() {
        return Err(ConfigError::validation("API timeout must be greater than 0"));
    }

    Ok(())
}
