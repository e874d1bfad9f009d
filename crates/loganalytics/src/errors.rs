// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while building the adapter. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Workspace Id and secret not defined in environment variable '{id_var}' and '{secret_var}'")]
    MissingWorkspace {
        id_var: &'static str,
        secret_var: &'static str,
    },
    #[error("workspace secret is not valid base64: {0}")]
    InvalidSecret(#[from] base64::DecodeError),
    #[error("invalid edge hub connection string: {0}")]
    ConnectionString(#[from] ConnectionStringError),
    #[error("invalid value '{value}' for {var}")]
    InvalidValue { var: &'static str, value: String },
    #[error("unable to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionStringError {
    #[error("segment '{0}' is not a key=value pair")]
    MalformedSegment(String),
    #[error("missing required key '{0}'")]
    MissingKey(&'static str),
}

/// Outcome of a single failed delivery attempt.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Connection, TLS or timeout failure. Never retried.
    #[error("[loganalytics] Post log request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Any non-2xx response from the ingestion endpoint.
    #[error("[loganalytics] Post log request failed with status: {} {body}", .status.as_u16())]
    Rejected { status: StatusCode, body: String },
    #[error("[loganalytics] unable to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DeliveryError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, DeliveryError::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_carries_status_and_body() {
        let err = DeliveryError::Rejected {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "try later".to_string(),
        };
        assert!(err.is_rejection());
        assert_eq!(
            err.to_string(),
            "[loganalytics] Post log request failed with status: 503 try later"
        );
    }

    #[test]
    fn missing_workspace_names_both_variables() {
        let err = ConfigError::MissingWorkspace {
            id_var: "A",
            secret_var: "B",
        };
        assert_eq!(
            err.to_string(),
            "Workspace Id and secret not defined in environment variable 'A' and 'B'"
        );
    }
}
