// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! SharedKey request signing.
//!
//! The ingestion endpoint authenticates each request with an HMAC-SHA256 over
//! a newline-joined canonical string:
//!
//! ```text
//! POST
//! <content length>
//! application/json
//! x-ms-date:<RFC 1123 date in GMT>
//! /api/logs
//! ```
//!
//! The date in the canonical string must be byte-identical to the `x-ms-date`
//! header sent with the request.

use crate::errors::ConfigError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt::Debug;

type HmacSha256 = Hmac<Sha256>;

pub const DATE_HEADER: &str = "x-ms-date";

/// Renders `time` the way the `x-ms-date` header expects it,
/// e.g. `Mon, 02 Jan 2006 15:04:05 GMT`.
pub fn rfc1123_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn string_to_sign(
    method: &str,
    content_length: usize,
    content_type: &str,
    date: &str,
    resource: &str,
) -> String {
    format!("{method}\n{content_length}\n{content_type}\n{DATE_HEADER}:{date}\n{resource}")
}

/// Holds the decoded workspace key.
#[derive(Clone)]
pub struct Signer {
    key: Vec<u8>,
}

impl Signer {
    /// Decodes the base64 workspace secret. This is the only way signing can fail.
    pub fn new(secret_b64: &str) -> Result<Self, ConfigError> {
        let key = STANDARD.decode(secret_b64.trim())?;
        Ok(Signer { key })
    }

    pub fn sign(
        &self,
        method: &str,
        content_length: usize,
        content_type: &str,
        date: &str,
        resource: &str,
    ) -> String {
        self.compute_hmac256(&string_to_sign(
            method,
            content_length,
            content_type,
            date,
            resource,
        ))
    }

    /// Base64 HMAC-SHA256 of `message`.
    pub fn compute_hmac256(&self, message: &str) -> String {
        // HMAC accepts keys of any length, so this cannot fail.
        let mut mac = match HmacSha256::new_from_slice(&self.key) {
            Ok(mac) => mac,
            Err(e) => unreachable!("HMAC key of any size is valid: {e}"),
        };
        mac.update(message.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

impl Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signer")
    }
}
