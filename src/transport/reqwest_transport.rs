//! HTTP transport implementation using reqwest.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use super::{HttpRequest, HttpResponse, Transport};
use crate::errors::{ClientError, ClientResult};

/// Default per-attempt request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            pool_max_idle_per_host: 10,
        }
    }
}

/// Reqwest-based transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a new reqwest transport.
    pub fn new(timeout: Duration) -> ClientResult<Self> {
        Self::with_config(TransportConfig {
            timeout,
            ..Default::default()
        })
    }

    /// Creates a new transport with configuration.
    pub fn with_config(config: TransportConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| ClientError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    /// Creates a new transport around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Converts response headers to a map with lowercase names.
    fn extract_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|val| (k.as_str().to_string(), val.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
        let mut builder = self.client.request(request.method.into(), request.url);

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = Self::extract_headers(response.headers());
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        let transport = ReqwestTransport::new(Duration::from_secs(30));
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let transport = ReqwestTransport::new(Duration::from_secs(1)).unwrap();
        let request = HttpRequest::get("http://127.0.0.1:1/").unwrap();

        let result = transport.send(request).await;
        assert!(matches!(result, Err(ClientError::Network { .. })));
    }
}
