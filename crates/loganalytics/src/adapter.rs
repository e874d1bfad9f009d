// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Entry points used by the host that routes container logs.

use crate::client::{ClientConfig, DeliveryClient};
use crate::errors::ConfigError;
use crate::observer::DeliveryObserver;
use crate::record::LogRecord;
use crate::stream::StreamConsumer;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Name the adapter is registered under with the log router.
pub const ADAPTER_NAME: &str = "loganalytics";

pub struct LogAnalyticsAdapter {
    consumer: StreamConsumer,
    client: DeliveryClient,
}

impl LogAnalyticsAdapter {
    /// Builds a ready-to-stream adapter from explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_client(DeliveryClient::new(config)?))
    }

    /// Builds an adapter from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn from_client(client: DeliveryClient) -> Self {
        debug!("LOGANALYTICS | Adapter ready, posting to {}", client.url());
        LogAnalyticsAdapter {
            consumer: StreamConsumer::new(client.clone()),
            client,
        }
    }

    pub fn with_observer(self, observer: Arc<dyn DeliveryObserver>) -> Self {
        Self::from_client(self.client.with_observer(observer))
    }

    pub fn client(&self) -> &DeliveryClient {
        &self.client
    }

    /// Consumes `records` until the host closes the channel.
    pub async fn stream(&self, records: mpsc::Receiver<LogRecord>) -> usize {
        self.consumer.consume(records).await
    }

    /// Waits for records still being retried, unless `cancel_token` fires
    /// first. Returns the number of retries left behind.
    pub async fn drain(&self, cancel_token: &CancellationToken) -> usize {
        let pending = self.client.pending_retries();
        if pending > 0 {
            info!("LOGANALYTICS | Waiting for {pending} records awaiting retry");
        }
        tokio::select! {
            _ = self.client.wait_for_retries() => {}
            _ = cancel_token.cancelled() => {}
        }
        self.client.pending_retries()
    }
}
