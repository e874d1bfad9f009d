// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(15);

/// How a rejected record is retried.
///
/// `max_attempts` counts retries only, not the initial attempt. `None` keeps
/// retrying until the endpoint accepts the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStrategy {
    Fixed {
        delay: Duration,
        max_attempts: Option<u32>,
    },
    ExponentialBackoff {
        base: Duration,
        max_delay: Duration,
        max_attempts: Option<u32>,
    },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::Fixed {
            delay: DEFAULT_RETRY_DELAY,
            max_attempts: None,
        }
    }
}

impl RetryStrategy {
    /// Delay before the `retry`th retry (1-based), or `None` once the
    /// strategy is exhausted.
    pub fn delay_for(&self, retry: u32) -> Option<Duration> {
        let (max_attempts, delay) = match self {
            RetryStrategy::Fixed {
                delay,
                max_attempts,
            } => (*max_attempts, *delay),
            RetryStrategy::ExponentialBackoff {
                base,
                max_delay,
                max_attempts,
            } => {
                let exp = retry.saturating_sub(1).min(31);
                let delay = base.saturating_mul(1u32 << exp).min(*max_delay);
                (*max_attempts, delay)
            }
        };
        match max_attempts {
            Some(max) if retry > max => None,
            _ => Some(delay),
        }
    }
}

/// Number of records with a retry task still alive.
#[derive(Debug, Clone, Default)]
pub struct PendingRetries(Arc<Pending>);

#[derive(Debug, Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl PendingRetries {
    pub fn get(&self) -> usize {
        self.0.count.load(Ordering::SeqCst)
    }

    /// Registers one pending retry task; the count drops when the guard does.
    #[must_use]
    pub fn track(&self) -> PendingGuard {
        self.0.count.fetch_add(1, Ordering::SeqCst);
        PendingGuard(Arc::clone(&self.0))
    }

    /// Resolves once no retry task is left.
    pub async fn wait_idle(&self) {
        loop {
            // Registered before the check so a drop in between is not missed.
            let notified = self.0.idle.notified();
            if self.get() == 0 {
                return;
            }
            notified.await;
        }
    }
}

pub struct PendingGuard(Arc<Pending>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}
