// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client construction.

use crate::errors::ConfigError;
use reqwest::ClientBuilder;
use std::time::Duration;

/// Overall timeout applied to every delivery attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the client shared by the stream consumer and every retry task.
pub fn get_client(
    timeout: Duration,
    https_proxy: Option<&str>,
) -> Result<reqwest::Client, ConfigError> {
    let mut builder = create_reqwest_client_builder()?.timeout(timeout);
    if let Some(proxy) = https_proxy {
        let proxy =
            reqwest::Proxy::https(proxy).map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

#[cfg(not(feature = "fips"))]
pub fn create_reqwest_client_builder() -> Result<ClientBuilder, ConfigError> {
    Ok(reqwest::Client::builder().use_rustls_tls())
}

/// TLS is pinned to the process-wide crypto provider, which has to be a FIPS
/// one installed before the adapter is built.
#[cfg(feature = "fips")]
pub fn create_reqwest_client_builder() -> Result<ClientBuilder, ConfigError> {
    Ok(reqwest::Client::builder().use_preconfigured_tls(fips::tls_config()?))
}

#[cfg(feature = "fips")]
mod fips {
    use crate::errors::ConfigError;
    use rustls::crypto::CryptoProvider;
    use rustls::{ClientConfig, RootCertStore};
    use std::sync::Arc;
    use tracing::debug;

    fn tls_error(reason: impl Into<String>) -> ConfigError {
        ConfigError::HttpClient(reason.into())
    }

    pub(super) fn tls_config() -> Result<ClientConfig, ConfigError> {
        let provider = installed_provider()?;
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| tls_error(format!("unsupported TLS versions: {e}")))?
            .with_root_certificates(native_roots()?)
            .with_no_client_auth();
        if config.fips() {
            Ok(config)
        } else {
            Err(tls_error("TLS configuration is not FIPS-compliant"))
        }
    }

    fn installed_provider() -> Result<Arc<CryptoProvider>, ConfigError> {
        match CryptoProvider::get_default() {
            Some(provider) if provider.fips() => Ok(Arc::clone(provider)),
            Some(_) => Err(tls_error("installed crypto provider is not FIPS-compliant")),
            None => Err(tls_error("no crypto provider installed")),
        }
    }

    /// Platform trust anchors. Unparseable entries are skipped, but at least
    /// one has to load.
    fn native_roots() -> Result<RootCertStore, ConfigError> {
        let loaded = rustls_native_certs::load_native_certs();
        for err in &loaded.errors {
            debug!("LOGANALYTICS | Unable to read native certificates: {err}");
        }
        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(loaded.certs);
        if ignored > 0 {
            debug!("LOGANALYTICS | Skipped {ignored} unparseable root certificates");
        }
        if added == 0 {
            return Err(tls_error("no usable certificates in the native root store"));
        }
        Ok(roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(feature = "fips"))]
    fn builds_client_without_proxy() {
        assert!(get_client(REQUEST_TIMEOUT, None).is_ok());
    }

    #[test]
    #[cfg(not(feature = "fips"))]
    fn invalid_proxy_is_a_config_error() {
        assert!(matches!(
            get_client(REQUEST_TIMEOUT, Some("::not a url::")),
            Err(ConfigError::HttpClient(_))
        ));
    }

    #[test]
    #[cfg(feature = "fips")]
    fn fips_build_requires_installed_provider() {
        // Nothing in the test binary installs a process-wide provider.
        let err = get_client(REQUEST_TIMEOUT, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to build HTTP client: no crypto provider installed"
        );
    }
}
