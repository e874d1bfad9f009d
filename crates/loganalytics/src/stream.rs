// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::client::DeliveryClient;
use crate::record::LogRecord;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::debug;

/// Drains records in arrival order and delivers each one.
///
/// The initial attempt for a record finishes before the next record is taken,
/// so attempts start in consumption order. Retries run in the background and
/// may complete in any order. Failures are reported to the client's observer
/// by the client itself and never stop the loop.
pub struct StreamConsumer {
    client: DeliveryClient,
}

impl StreamConsumer {
    pub fn new(client: DeliveryClient) -> Self {
        StreamConsumer { client }
    }

    /// Runs until every sender of `records` is dropped and the channel is
    /// empty. Returns the number of records consumed.
    pub async fn consume(&self, mut records: mpsc::Receiver<LogRecord>) -> usize {
        let mut consumed = 0;
        while let Some(record) = records.recv().await {
            consumed += 1;
            // Already reported to the observer; nothing goes back to the source.
            let _ = self.client.deliver(&record, Some(Utc::now())).await;
        }
        debug!("LOGANALYTICS | Record stream closed after {consumed} records");
        consumed
    }
}
