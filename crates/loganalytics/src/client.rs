// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Authenticated delivery of single log records to the ingestion endpoint.
//!
//! Every attempt rebuilds the signed request so the `x-ms-date` header is
//! fresh, while the record body (including its emission time) stays the same.
//! A rejected record is handed to one background retry task that keeps trying
//! according to the configured [`RetryStrategy`].

use crate::errors::{ConfigError, DeliveryError};
use crate::http::{get_client, REQUEST_TIMEOUT};
use crate::identity::IdentityConfig;
use crate::observer::{DeliveryObserver, TracingObserver};
use crate::record::{CanonicalRecord, LogRecord};
use crate::retry::{PendingRetries, RetryStrategy};
use crate::signer::{rfc1123_date, Signer, DATE_HEADER};
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const RESOURCE: &str = "/api/logs";
pub const API_VERSION: &str = "2016-04-01";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const LOG_TYPE: &str = "container_logs";
pub const TIME_GENERATED_FIELD: &str = "Timestamp";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub identity: IdentityConfig,
    /// Replaces `https://{workspace}.ods.opinsights.azure.com`, e.g. for a
    /// local mock endpoint.
    pub url_prefix_override: Option<String>,
    pub https_proxy: Option<String>,
    pub timeout: Duration,
    pub retry_strategy: RetryStrategy,
}

impl ClientConfig {
    pub fn new(identity: IdentityConfig) -> Self {
        ClientConfig {
            identity,
            url_prefix_override: None,
            https_proxy: None,
            timeout: REQUEST_TIMEOUT,
            retry_strategy: RetryStrategy::default(),
        }
    }
}

/// Sends log records to one workspace. Cheap to clone; clones share the HTTP
/// client, identity and pending retry count.
#[derive(Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
    identity: Arc<IdentityConfig>,
    signer: Arc<Signer>,
    url: Arc<str>,
    retry_strategy: RetryStrategy,
    observer: Arc<dyn DeliveryObserver>,
    pending: PendingRetries,
}

impl DeliveryClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let signer = Signer::new(&config.identity.workspace_secret)?;
        let client = get_client(config.timeout, config.https_proxy.as_deref())?;
        let prefix = match config.url_prefix_override {
            Some(prefix) => prefix.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}.ods.opinsights.azure.com",
                config.identity.workspace_id
            ),
        };

        Ok(DeliveryClient {
            client,
            identity: Arc::new(config.identity),
            signer: Arc::new(signer),
            url: format!("{prefix}{RESOURCE}?api-version={API_VERSION}").into(),
            retry_strategy: config.retry_strategy,
            observer: Arc::new(TracingObserver),
            pending: PendingRetries::default(),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn DeliveryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn identity(&self) -> &IdentityConfig {
        &self.identity
    }

    pub fn observer(&self) -> &Arc<dyn DeliveryObserver> {
        &self.observer
    }

    /// Records with a retry still pending.
    pub fn pending_retries(&self) -> usize {
        self.pending.get()
    }

    /// Resolves once every scheduled retry has finished.
    pub async fn wait_for_retries(&self) {
        self.pending.wait_idle().await;
    }

    /// Makes one delivery attempt and waits for its outcome.
    ///
    /// A transport failure is returned as is. A non-2xx response is returned
    /// as [`DeliveryError::Rejected`] and the same record, with the same
    /// timestamp, is queued for retry in the background. Either failure is
    /// also reported to the observer.
    pub async fn deliver(
        &self,
        record: &LogRecord,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<(), DeliveryError> {
        let timestamp = timestamp.or(record.time).unwrap_or_else(Utc::now);
        let result = self.attempt(record, timestamp, 1).await;
        if let Err(e) = &result {
            self.observer.on_failure(record, 1, e);
            if e.is_rejection() {
                self.schedule_retry(record.clone(), timestamp);
            }
        }
        result
    }

    async fn attempt(
        &self,
        record: &LogRecord,
        timestamp: DateTime<Utc>,
        attempt: u32,
    ) -> Result<(), DeliveryError> {
        self.observer.on_attempt(record, attempt);

        let canonical = CanonicalRecord::build(record, &self.identity, Some(timestamp));
        let body = serde_json::to_vec(&canonical)?;

        let date = rfc1123_date(Utc::now());
        let signature = self
            .signer
            .sign("POST", body.len(), JSON_CONTENT_TYPE, &date, RESOURCE);

        let response = self
            .client
            .post(&*self.url)
            .header(
                AUTHORIZATION,
                format!("SharedKey {}:{signature}", self.identity.workspace_id),
            )
            .header("Log-Type", LOG_TYPE)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(DATE_HEADER, &date)
            .header("time-generated-field", TIME_GENERATED_FIELD)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("LOGANALYTICS | Delivered record on attempt {attempt}");
            self.observer.on_success(record, attempt);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected { status, body })
    }

    /// Spawns the single retry task owned by `record`.
    fn schedule_retry(&self, record: LogRecord, timestamp: DateTime<Utc>) {
        let Some(delay) = self.retry_strategy.delay_for(1) else {
            self.observer.on_dropped(&record, 1);
            return;
        };
        let guard = self.pending.track();
        let client = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            client.retry(record, timestamp, delay).await;
        });
    }

    async fn retry(&self, record: LogRecord, timestamp: DateTime<Utc>, first_delay: Duration) {
        let mut retry = 1;
        let mut delay = first_delay;
        loop {
            let attempt = retry + 1;
            self.observer.on_retry_scheduled(&record, attempt, delay);
            tokio::time::sleep(delay).await;

            match self.attempt(&record, timestamp, attempt).await {
                Ok(()) => return,
                Err(e) => {
                    self.observer.on_failure(&record, attempt, &e);
                    if !e.is_rejection() {
                        return;
                    }
                }
            }

            retry += 1;
            match self.retry_strategy.delay_for(retry) {
                Some(next) => delay = next,
                None => {
                    self.observer.on_dropped(&record, attempt);
                    return;
                }
            }
        }
    }
}
