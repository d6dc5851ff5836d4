// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the smsflow configuration system.

use smsflow_config::diagnostic::ConfigError;
use smsflow_config::model::SmsflowConfig;
use smsflow_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_config() {
    let toml = r#"
[service]
name = "replies"
log_level = "debug"

[storage]
database_path = "/tmp/smsflow-test.db"
wal_mode = false

[webhook]
host = "127.0.0.1"
port = 8080
path = "/hook"
form_field = "events"
signature_header = "X-Signature"
secret = "s3cret"
debug_mode = false
min_delay_secs = 5
max_delay_secs = 10
queue_name = "inbound"

[sms]
server = "https://sms.example.com"
api_key = "key"
timeout_secs = 10
prioritize = false

[worker]
concurrency = 2
poll_interval_ms = 250
lease_secs = 60
max_attempts = 5
retry_delay_secs = 15
processed_ids_cap = 20

[admin]
bearer_token = "admin"
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.service.name, "replies");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/smsflow-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.webhook.port, 8080);
    assert_eq!(config.webhook.path, "/hook");
    assert_eq!(config.webhook.form_field, "events");
    assert_eq!(config.webhook.queue_name, "inbound");
    assert_eq!(config.signing_secret(), Some("s3cret"));
    assert_eq!(config.sms.server.as_deref(), Some("https://sms.example.com"));
    assert!(!config.sms.prioritize);
    assert_eq!(config.sms.send_path, "/services/send.php");
    assert_eq!(config.worker.concurrency, 2);
    assert_eq!(config.worker.processed_ids_cap, 20);
    assert_eq!(config.admin.bearer_token.as_deref(), Some("admin"));
}

/// Missing sections fall back to defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should deserialize");
    assert_eq!(config.service.name, "smsflow");
    assert_eq!(config.webhook.port, 5000);
    assert_eq!(config.webhook.path, "/sms_auto_reply");
    assert_eq!(config.webhook.form_field, "messages");
    assert_eq!(config.webhook.signature_header, "X-SG-SIGNATURE");
    assert_eq!(config.webhook.min_delay_secs, 60);
    assert_eq!(config.webhook.max_delay_secs, 180);
    assert_eq!(config.sms.timeout_secs, 30);
    assert_eq!(config.worker.concurrency, 4);
    assert_eq!(config.worker.max_attempts, 3);
    assert_eq!(config.worker.processed_ids_cap, 10);
    assert!(config.admin.bearer_token.is_none());
    assert!(config.storage.database_path.ends_with("smsflow.db"));
}

/// Dot-path overrides (as produced by the environment provider) win over TOML.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: SmsflowConfig = Figment::new()
        .merge(Serialized::defaults(SmsflowConfig::default()))
        .merge(Toml::string("[sms]\napi_key = \"from-toml\"\n"))
        .merge(("sms.api_key", "from-env"))
        .extract()
        .expect("should merge override");

    assert_eq!(config.sms.api_key.as_deref(), Some("from-env"));
}

/// A typo produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_key_suggests_correction() {
    let toml = r#"
[webhook]
debug_mod = true
"#;

    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key, suggestion, ..
            } => Some((key.clone(), suggestion.clone())),
            _ => None,
        })
        .expect("should produce UnknownKey");
    assert_eq!(unknown.0, "debug_mod");
    assert_eq!(unknown.1.as_deref(), Some("debug_mode"));
}

/// Unknown top-level sections are rejected.
#[test]
fn unknown_section_rejected() {
    let errors = load_and_validate_str("[redis]\nurl = \"redis://\"\n")
        .expect_err("unknown section should be rejected");
    assert!(!errors.is_empty());
}

/// Wrong value types produce InvalidType diagnostics.
#[test]
fn invalid_type_reported() {
    let errors = load_and_validate_str("[webhook]\nport = \"eighty\"\n")
        .expect_err("string port should be rejected");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("port"))),
        "{errors:?}"
    );
}

/// Defaults alone fail validation: no signing secret resolves.
#[test]
fn defaults_require_secret() {
    let errors = load_and_validate_str("").expect_err("no secret should fail");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("signing secret"))
    }));
}

/// Debug mode waives the secret.
#[test]
fn debug_mode_waives_secret() {
    let config = load_and_validate_str("[webhook]\ndebug_mode = true\n")
        .expect("debug mode needs no secret");
    assert!(config.webhook.debug_mode);
}

/// An inverted delay window is a validation error.
#[test]
fn inverted_delay_window_rejected() {
    let toml = r#"
[webhook]
debug_mode = true
min_delay_secs = 100
max_delay_secs = 50
"#;
    let errors = load_and_validate_str(toml).expect_err("inverted window should fail");
    assert!(errors.iter().any(|e| e.to_string().contains("min_delay_secs")));
}

/// Diagnostics render through miette.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "portt".to_string(),
        suggestion: Some("port".to_string()),
        valid_keys: "host, port".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("did you mean `port`"), "{help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render");
    assert!(buf.contains("portt"));
}
