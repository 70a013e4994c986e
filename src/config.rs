// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Only watch VirtualMachineInstances in this namespace; all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Number of instances reconciled concurrently
    pub max_concurrent_reconciles: u16,
    /// First requeue delay after a reconcile error
    pub error_backoff_base: Duration,
    /// Upper bound for the error requeue delay
    pub error_backoff_max: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            watch_namespace: None,
            max_concurrent_reconciles: 10,
            error_backoff_base: Duration::from_secs(5),
            error_backoff_max: Duration::from_secs(300),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());

        let max_concurrent_reconciles = match lookup("MAX_CONCURRENT_RECONCILES") {
            Some(v) => v
                .parse()
                .context("MAX_CONCURRENT_RECONCILES must be a positive integer")?,
            None => defaults.max_concurrent_reconciles,
        };

        let error_backoff_base = match lookup("ERROR_BACKOFF_BASE_SECS") {
            Some(v) => Duration::from_secs(
                v.parse()
                    .context("ERROR_BACKOFF_BASE_SECS must be a number of seconds")?,
            ),
            None => defaults.error_backoff_base,
        };

        let error_backoff_max = match lookup("ERROR_BACKOFF_MAX_SECS") {
            Some(v) => Duration::from_secs(
                v.parse()
                    .context("ERROR_BACKOFF_MAX_SECS must be a number of seconds")?,
            ),
            None => defaults.error_backoff_max,
        };

        if error_backoff_max < error_backoff_base {
            anyhow::bail!("ERROR_BACKOFF_MAX_SECS must not be lower than ERROR_BACKOFF_BASE_SECS");
        }

        Ok(Config {
            watch_namespace,
            max_concurrent_reconciles,
            error_backoff_base,
            error_backoff_max,
        })
    }
}
