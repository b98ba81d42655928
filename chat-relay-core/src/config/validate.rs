//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.gateway.host.trim().is_empty() {
        errors.push("gateway.host must not be empty".to_string());
    }
    if config.gateway.static_dir.trim().is_empty() {
        errors.push("gateway.static_dir must not be empty".to_string());
    }

    if config.provider.api_base.trim().is_empty() {
        errors.push("provider.api_base must not be empty".to_string());
    }
    if config.provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if config.provider.max_tokens == 0 {
        errors.push("provider.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.provider.temperature) {
        errors.push("provider.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.provider.timeout_secs == Some(0) {
        errors.push("provider.timeout_secs must be > 0 when set".to_string());
    }

    if config.client.gateway_url.trim().is_empty() {
        errors.push("client.gateway_url must not be empty".to_string());
    }
    if config.client.data_dir.trim().is_empty() {
        errors.push("client.data_dir must not be empty".to_string());
    }
    if config.client.max_message_chars == 0 {
        errors.push("client.max_message_chars must be > 0".to_string());
    }
    if config.client.reveal_interval_ms == 0 {
        errors.push("client.reveal_interval_ms must be > 0".to_string());
    }

    let format = config.logging.format.to_ascii_lowercase();
    if format != "text" && format != "json" {
        errors.push(format!(
            "logging.format must be 'text' or 'json', got '{}'",
            config.logging.format
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.provider.max_tokens = 0;
        config.client.reveal_interval_ms = 0;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("provider.max_tokens"));
        assert!(err.contains("client.reveal_interval_ms"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "yaml".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }
}
