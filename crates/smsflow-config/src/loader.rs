// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./smsflow.toml` > `~/.config/smsflow/smsflow.toml` >
//! `/etc/smsflow/smsflow.toml` with environment variable overrides via the
//! `SMSFLOW_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SmsflowConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/smsflow/smsflow.toml";
pub(crate) const LOCAL_CONFIG: &str = "smsflow.toml";

/// Config sections addressable from the environment.
const SECTIONS: &[&str] = &["service", "storage", "webhook", "sms", "worker", "admin"];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("smsflow").join("smsflow.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/smsflow/smsflow.toml` (system-wide)
/// 3. `~/.config/smsflow/smsflow.toml` (user XDG config)
/// 4. `./smsflow.toml` (local directory)
/// 5. `SMSFLOW_*` environment variables
pub fn load_config() -> Result<SmsflowConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<SmsflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SmsflowConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SmsflowConfig, figment::Error> {
    tracing::debug!(path = %path.display(), "loading configuration file");
    Figment::new()
        .merge(Serialized::defaults(SmsflowConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for hierarchy loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SmsflowConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider mapping `SMSFLOW_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `SMSFLOW_SMS_API_KEY` maps to `sms.api_key`, not `sms.api.key`.
fn env_provider() -> Env {
    Env::prefixed("SMSFLOW_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
