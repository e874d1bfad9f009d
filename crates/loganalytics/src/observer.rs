// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hook for watching deliveries. Failures never reach the record source, so
//! this is where they become visible.

use crate::errors::DeliveryError;
use crate::record::LogRecord;
use std::time::Duration;
use tracing::{debug, error};

/// Receives delivery events. `attempt` is 1 for the initial attempt and
/// increases with each retry.
#[allow(unused_variables)]
pub trait DeliveryObserver: Send + Sync {
    fn on_attempt(&self, record: &LogRecord, attempt: u32) {}

    fn on_success(&self, record: &LogRecord, attempt: u32) {}

    fn on_failure(&self, record: &LogRecord, attempt: u32, error: &DeliveryError) {}

    fn on_retry_scheduled(&self, record: &LogRecord, attempt: u32, delay: Duration) {}

    /// The retry strategy gave up on `record`.
    fn on_dropped(&self, record: &LogRecord, attempts: u32) {}
}

/// Default observer: reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DeliveryObserver for TracingObserver {
    fn on_failure(&self, record: &LogRecord, attempt: u32, error: &DeliveryError) {
        error!(
            "LOGANALYTICS | {error} (container: {}, attempt: {attempt})",
            record.container_name
        );
    }

    fn on_retry_scheduled(&self, record: &LogRecord, attempt: u32, delay: Duration) {
        debug!(
            "LOGANALYTICS | Retrying record from {} in {} ms (attempt {attempt})",
            record.container_name,
            delay.as_millis()
        );
    }

    fn on_dropped(&self, record: &LogRecord, attempts: u32) {
        error!(
            "LOGANALYTICS | Dropping record from {} after {attempts} attempts",
            record.container_name
        );
    }
}
