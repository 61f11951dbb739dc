// RabbitMQ management API queue inspector
// reason: reqwest JSON client; the AMQP wire protocol stays out of this crate
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use mqscaler_core::domain::{QueueIdentity, QueueState};
use mqscaler_core::port::queue_inspector::{InspectError, QueueInspector};

/// Default management API endpoint
pub const DEFAULT_MANAGEMENT_URL: &str = "http://localhost:15672";

/// Default request timeout (10s)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the management API
#[derive(Debug, Clone)]
pub struct ManagementApiConfig {
    pub url: String,
    pub username: String,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl Default for ManagementApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MANAGEMENT_URL.to_string(),
            username: "guest".to_string(),
            password: Some("guest".to_string()),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Subset of `GET /api/queues/{vhost}/{name}` we read
///
/// `messages_ready` is what a passive queue declare reports as the
/// message count.
#[derive(Debug, Deserialize)]
struct QueueInfo {
    #[serde(default)]
    messages_ready: u64,
    #[serde(default)]
    consumers: u32,
}

/// Queue inspector backed by the RabbitMQ management plugin
pub struct ManagementApiInspector {
    client: reqwest::Client,
    base_url: Url,
    username: String,
    password: Option<String>,
}

impl ManagementApiInspector {
    /// Create an inspector
    ///
    /// # Errors
    /// - InspectError::Connection if the URL is invalid or the HTTP client
    ///   cannot be built
    pub fn new(config: ManagementApiConfig) -> Result<Self, InspectError> {
        let base_url = Url::parse(&config.url).map_err(|e| {
            InspectError::Connection(format!("Invalid management URL '{}': {}", config.url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(InspectError::Connection(format!(
                "Management URL '{}' cannot be used as a base",
                config.url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InspectError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            username: config.username,
            password: config.password,
        })
    }

    /// `{base}/api/queues/{vhost}/{queue}` with each part percent-encoded
    fn queue_url(&self, queue: &QueueIdentity) -> Result<Url, InspectError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| InspectError::Connection(format!("Bad base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "queues", queue.vhost.as_str(), queue.queue.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl QueueInspector for ManagementApiInspector {
    async fn query_state(&self, queue: &QueueIdentity) -> Result<QueueState, InspectError> {
        let url = self.queue_url(queue)?;
        debug!(url = %url, "Querying queue state");

        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, self.password.as_ref())
            .send()
            .await
            .map_err(|e| InspectError::Connection(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(InspectError::NotFound(queue.to_string()));
        }
        if !status.is_success() {
            return Err(InspectError::InvalidResponse(format!(
                "HTTP {} for queue {}",
                status, queue
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| InspectError::Connection(e.to_string()))?;
        let info: QueueInfo = serde_json::from_slice(&body)
            .map_err(|e| InspectError::InvalidResponse(format!("Failed to parse queue: {}", e)))?;

        Ok(QueueState::new(info.messages_ready, info.consumers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response, returning the raw request head
    async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (url, handle)
    }

    fn inspector(url: String) -> ManagementApiInspector {
        ManagementApiInspector::new(ManagementApiConfig {
            url,
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_reads_ready_messages_and_consumers() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"name":"upload-picture","messages":160,"messages_ready":150,"consumers":5}"#,
        )
        .await;

        let state = inspector(url)
            .query_state(&QueueIdentity::new("upload_picture", "upload-picture"))
            .await
            .unwrap();

        assert_eq!(state, QueueState::new(150, 5));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/queues/%2F/upload-picture HTTP/1.1"));
        assert!(request.to_lowercase().contains("authorization: basic"));
    }

    #[tokio::test]
    async fn test_missing_counters_default_to_zero() {
        let (url, _server) = serve_once("200 OK", r#"{"name":"fresh"}"#).await;

        let state = inspector(url)
            .query_state(&QueueIdentity::new("fresh", "fresh"))
            .await
            .unwrap();

        assert_eq!(state, QueueState::default());
    }

    #[tokio::test]
    async fn test_unknown_queue_is_not_found() {
        let (url, _server) = serve_once("404 Not Found", r#"{"error":"Object Not Found"}"#).await;

        let err = inspector(url)
            .query_state(&QueueIdentity::new("ghost", "ghost").with_vhost("staging"))
            .await
            .unwrap_err();

        assert!(matches!(err, InspectError::NotFound(ref q) if q == "staging/ghost"));
    }

    #[tokio::test]
    async fn test_server_error_is_invalid_response() {
        let (url, _server) = serve_once("500 Internal Server Error", "{}").await;

        let err = inspector(url)
            .query_state(&QueueIdentity::new("jobs", "jobs"))
            .await
            .unwrap_err();

        assert!(matches!(err, InspectError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let (url, _server) = serve_once("200 OK", "not json").await;

        let err = inspector(url)
            .query_state(&QueueIdentity::new("jobs", "jobs"))
            .await
            .unwrap_err();

        assert!(matches!(err, InspectError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_broker_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = inspector(url)
            .query_state(&QueueIdentity::new("jobs", "jobs"))
            .await
            .unwrap_err();

        assert!(matches!(err, InspectError::Connection(_)));
    }

    #[test]
    fn test_queue_url_keeps_base_path() {
        let inspector = inspector("http://broker:15672/rabbit/".to_string());
        let url = inspector
            .queue_url(&QueueIdentity::new("c", "a/b").with_vhost("/"))
            .unwrap();

        assert_eq!(url.as_str(), "http://broker:15672/rabbit/api/queues/%2F/a%2Fb");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = ManagementApiInspector::new(ManagementApiConfig {
            url: "not a url".to_string(),
            ..Default::default()
        });

        assert!(matches!(result, Err(InspectError::Connection(_))));
    }
}
