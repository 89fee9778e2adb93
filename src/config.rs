// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Gateway and retry configuration.
//!
//! Loaded from a YAML file whose path comes from `--config` or the
//! `GSLB_CONFIG` environment variable. Secrets may instead be supplied
//! through `GSLB_MTD_AUTH_KEY` and `GSLB_DNS_PASSWORD`, which take precedence
//! over the file.
//!
//! ```yaml
//! mtd:
//!   url: https://mtd.example.com
//!   user: gslb
//!   authKey: secret
//!   groupId: 42
//!   gslbBaseDomain: gslb.example.com
//! dns:
//!   host: infoblox.example.com
//!   user: gslb
//!   password: secret
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BASE_CREATE_ATTEMPTS, DEFAULT_BASE_CREATE_RETRY_DELAY_SECS, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_WAPI_VERSION, ENV_DNS_PASSWORD, ENV_MTD_AUTH_KEY,
};
use crate::reconcilers::retry::RetryPolicy;

fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_wapi_version() -> String {
    DEFAULT_WAPI_VERSION.to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_BASE_CREATE_ATTEMPTS
}

fn default_delay_secs() -> u64 {
    DEFAULT_BASE_CREATE_RETRY_DELAY_SECS
}

/// Traffic-distribution (MTD) API settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MtdConfig {
    pub url: String,
    pub user: String,
    #[serde(default)]
    pub auth_key: String,
    pub group_id: u64,
    /// Domain under which base hostnames are created
    pub gslb_base_domain: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Infoblox WAPI settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DnsGatewayConfig {
    pub host: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_wapi_version")]
    pub wapi_version: String,
    /// Verify the grid master's TLS certificate
    #[serde(default)]
    pub tls_verify: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Base create-or-get retry settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new(config.max_attempts, Duration::from_secs(config.delay_secs))
    }
}

/// Complete configuration for the `gslb` binary.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GslbConfig {
    pub mtd: MtdConfig,
    pub dns: DnsGatewayConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

// Secrets stay out of logs
impl std::fmt::Debug for MtdConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MtdConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("auth_key", &"<redacted>")
            .field("group_id", &self.group_id)
            .field("gslb_base_domain", &self.gslb_base_domain)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl std::fmt::Debug for DnsGatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsGatewayConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("wapi_version", &self.wapi_version)
            .field("tls_verify", &self.tls_verify)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GslbConfig {
    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid configuration YAML.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse GSLB configuration")
    }

    /// Read, parse, apply environment overrides and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replace secrets with values from `lookup`, keyed by environment variable name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(ENV_MTD_AUTH_KEY).filter(|v| !v.is_empty()) {
            self.mtd.auth_key = key;
        }
        if let Some(password) = lookup(ENV_DNS_PASSWORD).filter(|v| !v.is_empty()) {
            self.dns.password = password;
        }
    }

    /// Check required settings.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing or invalid setting.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("mtd.url", &self.mtd.url),
            ("mtd.user", &self.mtd.user),
            ("mtd.gslbBaseDomain", &self.mtd.gslb_base_domain),
            ("dns.host", &self.dns.host),
            ("dns.user", &self.dns.user),
            ("dns.wapiVersion", &self.dns.wapi_version),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.maxAttempts must be at least 1");
        }
        Ok(())
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }
}
