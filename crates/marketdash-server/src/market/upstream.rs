//! Upstream market data fetchers.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::UpstreamConfig;

/// Why an upstream call produced no usable JSON.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("invalid JSON body: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("http client setup failed: {0}")]
    Client(#[source] reqwest::Error),
}

/// Source of raw market data.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Fetch the current JSON document for the upstream named `name`.
    async fn fetch(&self, name: &str, upstream: &UpstreamConfig) -> Result<Value, UpstreamError>;
}

/// [`UpstreamSource`] that issues a GET per call with `reqwest`.
#[derive(Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new() -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("marketdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(UpstreamError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamSource for HttpUpstream {
    async fn fetch(&self, name: &str, upstream: &UpstreamConfig) -> Result<Value, UpstreamError> {
        let response = self
            .client
            .get(&upstream.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(upstream.timeout)
            .send()
            .await
            .map_err(UpstreamError::Request)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(upstream = %name, status = status.as_u16(), "Upstream returned error status");
            return Err(UpstreamError::Status(status.as_u16()));
        }

        response.json::<Value>().await.map_err(UpstreamError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::CacheTier;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn upstream_for(server: &MockServer, route: &str) -> UpstreamConfig {
        UpstreamConfig::new(format!("{}{route}", server.uri()), CacheTier::Short)
    }

    #[tokio::test]
    async fn test_fetch_returns_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bitcoin": {"usd": 1}})))
            .mount(&server)
            .await;

        let http = HttpUpstream::new().unwrap();
        let value = http
            .fetch("prices", &upstream_for(&server, "/prices"))
            .await
            .unwrap();
        assert_eq!(value["bitcoin"]["usd"], 1);
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let http = HttpUpstream::new().unwrap();
        let err = http
            .fetch("prices", &upstream_for(&server, "/prices"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Status(503)));
    }

    #[tokio::test]
    async fn test_invalid_json_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&server)
            .await;

        let http = HttpUpstream::new().unwrap();
        let err = http
            .fetch("prices", &upstream_for(&server, "/prices"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut upstream = upstream_for(&server, "/slow");
        upstream.timeout = Duration::from_millis(50);

        let http = HttpUpstream::new().unwrap();
        let err = http.fetch("slow", &upstream).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Request(_)));
    }
}
