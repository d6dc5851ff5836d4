// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for smsflow.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level smsflow configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsflowConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Durable store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Inbound webhook settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Carrier gateway client settings.
    #[serde(default)]
    pub sms: SmsConfig,

    /// Delayed task worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Operator API settings.
    #[serde(default)]
    pub admin: AdminConfig,
}

impl SmsflowConfig {
    /// Shared secret used to verify webhook signatures.
    ///
    /// `webhook.secret` when set, otherwise the gateway API key.
    pub fn signing_secret(&self) -> Option<&str> {
        self.webhook
            .secret
            .as_deref()
            .or(self.sms.api_key.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name used in health output.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "smsflow".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("smsflow").join("smsflow.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("smsflow.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Inbound webhook configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Address to bind the HTTP server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the HTTP server to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Route receiving gateway events.
    #[serde(default = "default_webhook_path")]
    pub path: String,

    /// Form field carrying the JSON event array.
    #[serde(default = "default_form_field")]
    pub form_field: String,

    /// Header carrying the base64 HMAC-SHA256 signature.
    #[serde(default = "default_signature_header")]
    pub signature_header: String,

    /// Signing secret. Falls back to `sms.api_key` when unset.
    #[serde(default)]
    pub secret: Option<String>,

    /// Skip signature verification entirely.
    #[serde(default)]
    pub debug_mode: bool,

    /// Lower bound of the randomized reply delay.
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: u64,

    /// Upper bound of the randomized reply delay.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    /// Task queue receiving inbound events.
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("form_field", &self.form_field)
            .field("signature_header", &self.signature_header)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("debug_mode", &self.debug_mode)
            .field("min_delay_secs", &self.min_delay_secs)
            .field("max_delay_secs", &self.max_delay_secs)
            .field("queue_name", &self.queue_name)
            .finish()
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_webhook_path(),
            form_field: default_form_field(),
            signature_header: default_signature_header(),
            secret: None,
            debug_mode: false,
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            queue_name: default_queue_name(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_webhook_path() -> String {
    "/sms_auto_reply".to_string()
}

fn default_form_field() -> String {
    "messages".to_string()
}

fn default_signature_header() -> String {
    "X-SG-SIGNATURE".to_string()
}

fn default_min_delay_secs() -> u64 {
    60
}

fn default_max_delay_secs() -> u64 {
    180
}

fn default_queue_name() -> String {
    "default".to_string()
}

/// Carrier gateway client configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// Gateway base URL, e.g. `https://sms.example.com`.
    #[serde(default)]
    pub server: Option<String>,

    /// Gateway API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Path of the send endpoint.
    #[serde(default = "default_send_path")]
    pub send_path: String,

    /// Path of the device listing endpoint.
    #[serde(default = "default_devices_path")]
    pub devices_path: String,

    /// Timeout for one gateway call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ask the gateway to prioritize replies.
    #[serde(default = "default_prioritize")]
    pub prioritize: bool,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("server", &self.server)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("send_path", &self.send_path)
            .field("devices_path", &self.devices_path)
            .field("timeout_secs", &self.timeout_secs)
            .field("prioritize", &self.prioritize)
            .finish()
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            server: None,
            api_key: None,
            send_path: default_send_path(),
            devices_path: default_devices_path(),
            timeout_secs: default_timeout_secs(),
            prioritize: default_prioritize(),
        }
    }
}

fn default_send_path() -> String {
    "/services/send.php".to_string()
}

fn default_devices_path() -> String {
    "/services/get-devices.php".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_prioritize() -> bool {
    true
}

/// Delayed task worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Number of concurrent worker tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Idle poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Lease held on a claimed task before another worker may reclaim it.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Attempts before a task is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before a failed task is retried.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Processed event ids remembered per contact.
    #[serde(default = "default_processed_ids_cap")]
    pub processed_ids_cap: usize,

    /// Time allowed for in-flight tasks to finish on shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval_ms(),
            lease_secs: default_lease_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            processed_ids_cap: default_processed_ids_cap(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_lease_secs() -> u64 {
    300
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    30
}

fn default_processed_ids_cap() -> usize {
    10
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

/// Operator API configuration.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    /// Bearer token for `/admin`. The operator API is not mounted when unset.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
