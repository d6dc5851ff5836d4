// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as delay windows, non-empty paths, and secret resolution.

use crate::diagnostic::ConfigError;
use crate::model::SmsflowConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SmsflowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let host = config.webhook.host.trim();
    if host.is_empty() {
        fail("webhook.host must not be empty".to_string());
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "webhook.host `{host}` is not a valid IP address or hostname"
        ));
    }

    if !config.webhook.path.starts_with('/') {
        fail(format!(
            "webhook.path must start with `/`, got `{}`",
            config.webhook.path
        ));
    }

    if config.webhook.form_field.trim().is_empty() {
        fail("webhook.form_field must not be empty".to_string());
    }

    if config.webhook.min_delay_secs > config.webhook.max_delay_secs {
        fail(format!(
            "webhook.min_delay_secs ({}) must not exceed webhook.max_delay_secs ({})",
            config.webhook.min_delay_secs, config.webhook.max_delay_secs
        ));
    }

    if !config.webhook.debug_mode && config.signing_secret().is_none() {
        fail(
            "a signing secret is required unless webhook.debug_mode is set; \
             set webhook.secret or sms.api_key"
                .to_string(),
        );
    }

    if let Some(server) = &config.sms.server {
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            fail(format!(
                "sms.server must start with http:// or https://, got `{server}`"
            ));
        }
    }

    if config.sms.timeout_secs == 0 {
        fail("sms.timeout_secs must be at least 1".to_string());
    }

    if config.worker.concurrency < 1 {
        fail("worker.concurrency must be at least 1".to_string());
    }

    if config.worker.max_attempts < 1 {
        fail("worker.max_attempts must be at least 1".to_string());
    }

    if config.worker.processed_ids_cap < 1 {
        fail("worker.processed_ids_cap must be at least 1".to_string());
    }

    if config.worker.poll_interval_ms == 0 {
        fail("worker.poll_interval_ms must be at least 1".to_string());
    }

    if let Some(token) = &config.admin.bearer_token {
        if token.trim().is_empty() {
            fail("admin.bearer_token must not be blank when set".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SmsflowConfig {
        let mut config = SmsflowConfig::default();
        config.sms.api_key = Some("key".into());
        config.sms.server = Some("https://sms.example.com".into());
        config
    }

    fn messages(config: &SmsflowConfig) -> Vec<String> {
        validate_config(config)
            .err()
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn defaults_with_secret_are_valid() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn missing_secret_fails_unless_debug() {
        let mut config = valid();
        config.sms.api_key = None;
        assert!(messages(&config).iter().any(|m| m.contains("signing secret")));
        config.webhook.debug_mode = true;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = valid();
        config.webhook.min_delay_secs = 200;
        config.worker.concurrency = 0;
        config.worker.max_attempts = 0;
        config.webhook.path = "hook".into();
        config.sms.server = Some("ftp://nope".into());
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 5, "{msgs:?}");
    }

    #[test]
    fn toml_with_inverted_delay_window_fails() {
        let toml_str = r#"
[webhook]
secret = "s"
min_delay_secs = 90
max_delay_secs = 30
"#;
        let config: SmsflowConfig = toml::from_str(toml_str).unwrap();
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 1, "{msgs:?}");
        assert!(msgs[0].contains("min_delay_secs (90)"));
    }

    #[test]
    fn toml_with_blank_admin_token_fails() {
        let toml_str = r#"
[webhook]
debug_mode = true

[admin]
bearer_token = "  "
"#;
        let config: SmsflowConfig = toml::from_str(toml_str).unwrap();
        assert!(messages(&config).iter().any(|m| m.contains("admin.bearer_token")));
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        let toml_str = r#"
[worker]
concurency = 4
"#;
        let result = toml::from_str::<SmsflowConfig>(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn equal_delay_bounds_are_allowed() {
        let mut config = valid();
        config.webhook.min_delay_secs = 0;
        config.webhook.max_delay_secs = 0;
        assert!(validate_config(&config).is_ok());
    }
}
