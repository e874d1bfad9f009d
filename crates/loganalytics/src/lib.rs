// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ships container log records to an Azure Log Analytics workspace using the
//! HTTP Data Collector API and SharedKey request signing.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod adapter;
pub mod client;
pub mod config;
pub mod errors;
pub mod http;
pub mod identity;
pub mod observer;
pub mod record;
pub mod retry;
pub mod signer;
pub mod stream;
