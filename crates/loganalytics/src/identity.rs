// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Deployment identity: which workspace to write to and which edge device the
//! records come from.

use crate::errors::{ConfigError, ConnectionStringError};
use std::env;
use std::str::FromStr;

pub const ENV_WORKSPACE_ID: &str = "LOGANALYTICS_WORKSPACE_ID";
pub const ENV_WORKSPACE_SECRET: &str = "LOGANALYTICS_WORKSPACE_SECRET";
pub const ENV_IOTHUB_NAME: &str = "IOTEDGE_IOTHUBHOSTNAME";
pub const ENV_IOTHUB_DEVICE_ID: &str = "IOTEDGE_DEVICEID";
pub const ENV_GATEWAY_HOSTNAME: &str = "IOTEDGE_GATEWAYHOSTNAME";
pub const ENV_EDGE_HUB_CONNECTION_STRING: &str = "EdgeHubConnectionString";

/// Identity bundle embedded in every delivery client. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub workspace_id: String,
    /// Base64 encoded shared key, decoded by the signer.
    pub workspace_secret: String,
    pub hub_name: Option<String>,
    pub device_id: Option<String>,
    pub hostname: Option<String>,
}

impl IdentityConfig {
    pub fn new(workspace_id: impl Into<String>, workspace_secret: impl Into<String>) -> Self {
        IdentityConfig {
            workspace_id: workspace_id.into(),
            workspace_secret: workspace_secret.into(),
            hub_name: None,
            device_id: None,
            hostname: None,
        }
    }

    pub fn with_hub_name(mut self, hub_name: impl Into<String>) -> Self {
        self.hub_name = Some(hub_name.into());
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves the identity through `lookup`, which returns the value of a
    /// variable if it is set.
    ///
    /// The hub name comes from its own variable first. When it is missing the
    /// edge hub connection string is parsed instead, and a malformed string is
    /// reported rather than ignored. The device id and hostname fall back to
    /// their discrete variables if still unresolved.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let (Some(workspace_id), Some(workspace_secret)) =
            (get(ENV_WORKSPACE_ID), get(ENV_WORKSPACE_SECRET))
        else {
            return Err(ConfigError::MissingWorkspace {
                id_var: ENV_WORKSPACE_ID,
                secret_var: ENV_WORKSPACE_SECRET,
            });
        };

        let mut identity = IdentityConfig::new(workspace_id, workspace_secret);
        identity.hub_name = get(ENV_IOTHUB_NAME);

        if identity.hub_name.is_none() {
            if let Some(conn_str) = get(ENV_EDGE_HUB_CONNECTION_STRING) {
                let parsed: EdgeHubConnectionString = conn_str.parse()?;
                identity.hub_name = Some(parsed.host_name);
                identity.hostname = Some(parsed.gateway_host_name);
                identity.device_id = Some(parsed.device_id);
            }
        }

        if identity.device_id.is_none() {
            identity.device_id = get(ENV_IOTHUB_DEVICE_ID);
            identity.hostname = get(ENV_GATEWAY_HOSTNAME);
        }

        Ok(identity)
    }
}

/// Typed view of `HostName=...;GatewayHostName=...;DeviceId=...;...`.
///
/// Keys are matched case-insensitively and in any order; unknown keys such as
/// `ModuleId` or `SharedAccessKey` are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeHubConnectionString {
    pub host_name: String,
    pub gateway_host_name: String,
    pub device_id: String,
}

impl FromStr for EdgeHubConnectionString {
    type Err = ConnectionStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut host_name = None;
        let mut gateway_host_name = None;
        let mut device_id = None;

        for segment in s.split(';').map(str::trim).filter(|seg| !seg.is_empty()) {
            // Values may contain '=' (base64 keys), so only split on the first one.
            let Some((key, value)) = segment.split_once('=') else {
                return Err(ConnectionStringError::MalformedSegment(segment.to_string()));
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "hostname" => host_name = Some(value.to_string()),
                "gatewayhostname" => gateway_host_name = Some(value.to_string()),
                "deviceid" => device_id = Some(value.to_string()),
                _ => {}
            }
        }

        let required = |field: Option<String>, key| {
            field
                .filter(|v| !v.is_empty())
                .ok_or(ConnectionStringError::MissingKey(key))
        };

        Ok(EdgeHubConnectionString {
            host_name: required(host_name, "HostName")?,
            gateway_host_name: required(gateway_host_name, "GatewayHostName")?,
            device_id: required(device_id, "DeviceId")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    const CONN_STR: &str = "HostName=hub.azure-devices.net;GatewayHostName=edge-gw;DeviceId=dev-01;ModuleId=$edgeHub;SharedAccessKey=abc==";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_connection_string() {
        let parsed: EdgeHubConnectionString = CONN_STR.parse().unwrap();
        assert_eq!(parsed.host_name, "hub.azure-devices.net");
        assert_eq!(parsed.gateway_host_name, "edge-gw");
        assert_eq!(parsed.device_id, "dev-01");
    }

    #[test]
    fn connection_string_key_order_does_not_matter() {
        let parsed: EdgeHubConnectionString = "DeviceId=d;hostname=h;GatewayHostName=g"
            .parse()
            .unwrap();
        assert_eq!(parsed.host_name, "h");
        assert_eq!(parsed.gateway_host_name, "g");
        assert_eq!(parsed.device_id, "d");
    }

    #[test]
    fn connection_string_missing_key_is_an_error() {
        let err = "HostName=h;DeviceId=d;"
            .parse::<EdgeHubConnectionString>()
            .unwrap_err();
        assert_eq!(err, ConnectionStringError::MissingKey("GatewayHostName"));
    }

    #[test]
    fn connection_string_garbage_is_an_error() {
        let err = "not a connection string"
            .parse::<EdgeHubConnectionString>()
            .unwrap_err();
        assert_eq!(
            err,
            ConnectionStringError::MalformedSegment("not a connection string".to_string())
        );
    }

    #[test]
    fn missing_workspace_is_an_error() {
        let err = IdentityConfig::from_lookup(lookup(&[(ENV_WORKSPACE_ID, "ws")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingWorkspace { .. }));
    }

    #[test]
    fn discrete_variables_win_over_connection_string() {
        let identity = IdentityConfig::from_lookup(lookup(&[
            (ENV_WORKSPACE_ID, "ws"),
            (ENV_WORKSPACE_SECRET, "c2VjcmV0"),
            (ENV_IOTHUB_NAME, "hub-from-env"),
            (ENV_IOTHUB_DEVICE_ID, "device-from-env"),
            (ENV_GATEWAY_HOSTNAME, "gw-from-env"),
            (ENV_EDGE_HUB_CONNECTION_STRING, CONN_STR),
        ]))
        .unwrap();
        assert_eq!(identity.hub_name.as_deref(), Some("hub-from-env"));
        assert_eq!(identity.device_id.as_deref(), Some("device-from-env"));
        assert_eq!(identity.hostname.as_deref(), Some("gw-from-env"));
    }

    #[test]
    fn connection_string_fills_identity_when_hub_name_unset() {
        let identity = IdentityConfig::from_lookup(lookup(&[
            (ENV_WORKSPACE_ID, "ws"),
            (ENV_WORKSPACE_SECRET, "c2VjcmV0"),
            (ENV_IOTHUB_DEVICE_ID, "ignored"),
            (ENV_EDGE_HUB_CONNECTION_STRING, CONN_STR),
        ]))
        .unwrap();
        assert_eq!(identity.hub_name.as_deref(), Some("hub.azure-devices.net"));
        assert_eq!(identity.device_id.as_deref(), Some("dev-01"));
        assert_eq!(identity.hostname.as_deref(), Some("edge-gw"));
    }

    #[test]
    fn malformed_connection_string_is_reported() {
        let err = IdentityConfig::from_lookup(lookup(&[
            (ENV_WORKSPACE_ID, "ws"),
            (ENV_WORKSPACE_SECRET, "c2VjcmV0"),
            (ENV_EDGE_HUB_CONNECTION_STRING, "HostName=h;DeviceId=d"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::ConnectionString(_)));
    }

    #[test]
    fn empty_values_are_treated_as_unset() {
        let identity = IdentityConfig::from_lookup(lookup(&[
            (ENV_WORKSPACE_ID, "ws"),
            (ENV_WORKSPACE_SECRET, "c2VjcmV0"),
            (ENV_IOTHUB_NAME, ""),
            (ENV_IOTHUB_DEVICE_ID, "  "),
        ]))
        .unwrap();
        assert_eq!(identity.hub_name, None);
        assert_eq!(identity.device_id, None);
        assert_eq!(identity.hostname, None);
    }

    #[test]
    #[serial]
    fn from_env_reads_process_environment() {
        env::set_var(ENV_WORKSPACE_ID, "env-ws");
        env::set_var(ENV_WORKSPACE_SECRET, "c2VjcmV0");
        env::set_var(ENV_IOTHUB_DEVICE_ID, "env-device");
        env::remove_var(ENV_IOTHUB_NAME);
        env::remove_var(ENV_EDGE_HUB_CONNECTION_STRING);

        let identity = IdentityConfig::from_env().unwrap();
        assert_eq!(identity.workspace_id, "env-ws");
        assert_eq!(identity.device_id.as_deref(), Some("env-device"));

        env::remove_var(ENV_WORKSPACE_ID);
        env::remove_var(ENV_WORKSPACE_SECRET);
        env::remove_var(ENV_IOTHUB_DEVICE_ID);
    }

    #[test]
    #[serial]
    fn from_env_without_workspace_fails() {
        env::remove_var(ENV_WORKSPACE_ID);
        env::remove_var(ENV_WORKSPACE_SECRET);
        assert!(IdentityConfig::from_env().is_err());
    }
}
