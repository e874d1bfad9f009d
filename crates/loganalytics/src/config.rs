// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client settings read from the process environment.

use crate::client::ClientConfig;
use crate::errors::ConfigError;
use crate::identity::IdentityConfig;
use crate::retry::{RetryStrategy, DEFAULT_RETRY_DELAY};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_RETRY_DELAY_SECS: &str = "LOGANALYTICS_RETRY_DELAY_SECS";
pub const ENV_RETRY_MAX_DELAY_SECS: &str = "LOGANALYTICS_RETRY_MAX_DELAY_SECS";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "LOGANALYTICS_RETRY_MAX_ATTEMPTS";
pub const ENV_URL_PREFIX: &str = "LOGANALYTICS_URL_PREFIX";
pub const ENV_HTTPS_PROXY: &str = "HTTPS_PROXY";

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let identity = IdentityConfig::from_lookup(&lookup)?;
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let delay = parse_secs(ENV_RETRY_DELAY_SECS, get(ENV_RETRY_DELAY_SECS))?
            .unwrap_or(DEFAULT_RETRY_DELAY);
        let max_delay = parse_secs(ENV_RETRY_MAX_DELAY_SECS, get(ENV_RETRY_MAX_DELAY_SECS))?;
        let max_attempts = parse::<u32>(ENV_RETRY_MAX_ATTEMPTS, get(ENV_RETRY_MAX_ATTEMPTS))?;

        // A ceiling above the base delay turns on exponential backoff.
        let retry_strategy = match max_delay {
            Some(max_delay) if max_delay > delay => RetryStrategy::ExponentialBackoff {
                base: delay,
                max_delay,
                max_attempts,
            },
            _ => RetryStrategy::Fixed {
                delay,
                max_attempts,
            },
        };

        let mut config = ClientConfig::new(identity);
        config.retry_strategy = retry_strategy;
        config.url_prefix_override = get(ENV_URL_PREFIX);
        config.https_proxy = get(ENV_HTTPS_PROXY);
        Ok(config)
    }
}

/// Whole seconds; zero is rejected.
fn parse_secs(var: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    match parse::<u64>(var, value)? {
        Some(0) => Err(ConfigError::InvalidValue {
            var,
            value: "0".to_string(),
        }),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

fn parse<T: FromStr>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| match v.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(_) => Err(ConfigError::InvalidValue { var, value: v }),
        })
        .transpose()
}
