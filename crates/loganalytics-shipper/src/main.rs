// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use loganalytics::{
    adapter::{LogAnalyticsAdapter, ADAPTER_NAME},
    record::LogRecord,
};

const RECORD_CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
pub async fn main() {
    let log_level = env::var("LOGANALYTICS_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let adapter = match LogAnalyticsAdapter::from_env() {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Error creating {ADAPTER_NAME} adapter on startup: {e}");
            std::process::exit(1);
        }
    };
    info!("{ADAPTER_NAME}: shipping records to {}", adapter.client().url());

    let cancel_token = CancellationToken::new();
    let (tx, rx) = mpsc::channel(RECORD_CHANNEL_CAPACITY);

    let reader_token = cancel_token.clone();
    tokio::spawn(async move {
        read_records(tx, reader_token).await;
    });

    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("{ADAPTER_NAME}: interrupted, stopping");
            signal_token.cancel();
        }
    });

    let consumed = adapter.stream(rx).await;
    info!("{ADAPTER_NAME}: consumed {consumed} records");

    // Retry tasks die with the runtime, so hold on until they finish or
    // the operator interrupts.
    let abandoned = adapter.drain(&cancel_token).await;
    if abandoned > 0 {
        warn!("{ADAPTER_NAME}: exiting with {abandoned} records still awaiting retry");
    }
}

/// Reads newline-delimited JSON records from stdin until EOF or cancellation.
/// Dropping `tx` on return closes the record stream.
async fn read_records(tx: mpsc::Sender<LogRecord>, cancel_token: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = cancel_token.cancelled() => break,
        };
        match line {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match serde_json::from_str::<LogRecord>(&line) {
                Ok(record) => {
                    if tx.send(record).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{ADAPTER_NAME}: skipping malformed record: {e}"),
            },
            Ok(None) => break,
            Err(e) => {
                error!("{ADAPTER_NAME}: failed to read stdin: {e}");
                break;
            }
        }
    }
    debug!("{ADAPTER_NAME}: record source closed");
}
