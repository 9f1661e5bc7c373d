use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upload limit and timeout are positive
/// - Circuit breaker thresholds are reachable
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.convert.max_file_size == 0 {
        return Err(ConfigError::ValidationError(
            "convert.max_file_size must be greater than 0".to_string(),
        ));
    }

    if config.convert.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "convert.timeout_ms must be greater than 0".to_string(),
        ));
    }

    let circuit = &config.circuit;
    if !(circuit.failure_ratio > 0.0 && circuit.failure_ratio <= 1.0) {
        return Err(ConfigError::ValidationError(format!(
            "circuit.failure_ratio must be in (0, 1], got {}",
            circuit.failure_ratio
        )));
    }

    if circuit.volume_threshold == 0 {
        return Err(ConfigError::ValidationError(
            "circuit.volume_threshold must be at least 1".to_string(),
        ));
    }

    // A window smaller than the volume threshold can never trip the breaker
    if circuit.window_size < circuit.volume_threshold {
        return Err(ConfigError::ValidationError(format!(
            "circuit.window_size ({}) must be >= circuit.volume_threshold ({})",
            circuit.window_size, circuit.volume_threshold
        )));
    }

    Ok(())
}
