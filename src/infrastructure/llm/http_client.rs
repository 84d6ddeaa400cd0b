use std::time::Duration;

use async_trait::async_trait;

use crate::domain::DomainError;

/// JSON-over-HTTP transport shared by the LLM provider and remote search sources
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    name: &'static str,
    timeout: Option<Duration>,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            name: "http",
            timeout: None,
        }
    }

    /// Client whose requests are aborted after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            name: "http",
            timeout: Some(timeout),
        })
    }

    /// Name reported in provider errors
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    fn transport_error(&self, context: &str, e: reqwest::Error) -> DomainError {
        if e.is_timeout() {
            let timeout_ms = self.timeout.map(|t| t.as_millis() as u64).unwrap_or_default();
            DomainError::timeout(format!("{} request", self.name), timeout_ms)
        } else {
            DomainError::provider(self.name, format!("{}: {}", context, e))
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error("Request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(DomainError::provider(
                self.name,
                format!("HTTP {}: {}", status, error_body),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| self.transport_error("Failed to parse response", e))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_post_json_sends_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({"query": "bread"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let response = client
            .post_json(
                &format!("{}/search", server.uri()),
                vec![("Authorization", "Bearer secret")],
                &json!({"query": "bread"}),
            )
            .await
            .unwrap();

        assert_eq!(response["ok"], true);
    }

    #[tokio::test]
    async fn test_post_json_maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = HttpClient::new().named("groq");
        let err = client
            .post_json(&server.uri(), vec![], &json!({}))
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("groq"));
        assert!(message.contains("503"));
        assert!(message.contains("overloaded"));
    }

    #[tokio::test]
    async fn test_transport_timeout_is_a_timeout_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = HttpClient::with_timeout(Duration::from_millis(50)).unwrap().named("groq");
        let err = client
            .post_json(&server.uri(), vec![], &json!({}))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(matches!(
            err,
            DomainError::Timeout { ref operation, timeout_ms: 50 } if operation == "groq request"
        ));
    }
}
