//! Pooled HTTP transport.
//!
//! One shared `reqwest::Client` backs every endpoint that doesn't ask for a
//! connection override; endpoints that set `disableKeepAlive`,
//! `forceNewConnection`, or a custom `timeout` get a short-lived client built
//! to their own settings instead of touching the shared pool.

use crate::config::HttpTransportConfig;
use crate::errors::HttpError;
use crate::types::HttpResponse;
use mcpfusion_config::{ConnectionOverrides, EndpointConfig};
use mcpfusion_core::HttpMethod;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION};
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

fn build_client(config: &HttpTransportConfig, connection: Option<&ConnectionOverrides>) -> Client {
    let mut builder = Client::builder()
        .pool_max_idle_per_host(config.max_idle_per_host)
        .pool_idle_timeout(config.idle_timeout)
        .connect_timeout(config.connect_timeout)
        .timeout(config.default_timeout)
        .tcp_keepalive(config.keepalive_probe)
        .user_agent(config.user_agent.clone());

    if let Some(overrides) = connection {
        if overrides.disable_keep_alive || overrides.force_new_connection {
            builder = builder.pool_max_idle_per_host(0);
        }
        if let Some(timeout) = overrides.timeout {
            builder = builder.timeout(timeout);
        }
    }

    builder.build().expect("reqwest client configuration is always valid")
}

/// Shared pooled transport with per-endpoint override support and a
/// background idle-connection sweeper.
pub struct HttpTransport {
    config: HttpTransportConfig,
    shared: RwLock<Client>,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Self {
        let client = build_client(&config, None);
        Self {
            config,
            shared: RwLock::new(client),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(HttpTransportConfig::default())
    }

    fn shared_client(&self) -> Client {
        self.shared.read().expect("transport lock poisoned").clone()
    }

    fn client_for(&self, overrides: &ConnectionOverrides) -> Client {
        if overrides.disable_keep_alive || overrides.force_new_connection || overrides.timeout.is_some() {
            build_client(&self.config, Some(overrides))
        } else {
            self.shared_client()
        }
    }

    /// Rebuilds the shared pooled client, dropping the old one's idle
    /// connections.
    pub fn sweep_idle(&self) {
        let fresh = build_client(&self.config, None);
        *self.shared.write().expect("transport lock poisoned") = fresh;
        tracing::debug!("http idle-connection sweep complete");
    }

    pub fn sweep_interval(&self) -> Duration {
        self.config.sweep_interval
    }

    /// Executes a single upstream request and normalizes the response.
    pub async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&JsonValue>,
        overrides: &ConnectionOverrides,
    ) -> Result<HttpResponse, HttpError> {
        let client = self.client_for(overrides);
        let mut request = client.request(method.into(), url);

        let mut header_map = HeaderMap::new();
        for (key, value) in headers {
            let name = HeaderName::try_from(key.as_str())
                .map_err(|_| HttpError::InvalidHeaderName(key.clone()))?;
            let value = HeaderValue::from_str(value).map_err(|_| HttpError::InvalidHeaderValue {
                name: key.clone(),
                value: value.clone(),
            })?;
            header_map.insert(name, value);
        }
        if overrides.disable_keep_alive {
            header_map.insert(CONNECTION, HeaderValue::from_static("close"));
        }
        request = request.headers(header_map);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let response_headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(&bytes).into_owned()));

        Ok(HttpResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

/// Periodic idle-connection sweep: closes idle connections on a background
/// interval. Stops as soon as `shutdown` reports `true`, so the caller can
/// bind it to process shutdown without the sweep racing a half-closed
/// transport.
pub async fn run_idle_sweeper(transport: Arc<HttpTransport>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let interval = transport.sweep_interval();
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => transport.sweep_idle(),
            _ = shutdown.changed() => break,
        }
    }
}

/// Derives the `ConnectionOverrides` in effect for an endpoint, convenience
/// wrapper used by the request pipeline.
pub fn connection_overrides(endpoint: &EndpointConfig) -> &ConnectionOverrides {
    &endpoint.connection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transport_builds_without_overrides() {
        let transport = HttpTransport::with_defaults();
        let plain = ConnectionOverrides::default();
        let _client = transport.client_for(&plain);
    }

    #[test]
    fn sweep_idle_replaces_shared_client() {
        let transport = HttpTransport::with_defaults();
        let before = transport.shared_client();
        transport.sweep_idle();
        let after = transport.shared_client();
        // both are valid, independently constructed clients
        drop(before);
        drop(after);
    }

    #[test]
    fn force_new_connection_bypasses_shared_pool() {
        let transport = HttpTransport::with_defaults();
        let overrides = ConnectionOverrides {
            force_new_connection: true,
            ..Default::default()
        };
        let _client = transport.client_for(&overrides);
    }
}
