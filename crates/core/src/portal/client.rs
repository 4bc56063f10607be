//! Raw document fetching from the event portal.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::error::ManifestError;

/// Source of raw event documents.
///
/// Implementations perform I/O only; parsing happens in [`crate::manifest`].
#[async_trait]
pub trait ManifestClient: Send + Sync {
    /// Fetch the event list document.
    async fn fetch_event_list(&self) -> Result<Value, ManifestError>;

    /// Fetch the full manifest document of one event.
    async fn fetch_event_document(&self, event_id: &str) -> Result<Value, ManifestError>;
}

/// HTTP client for the event portal.
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    events_url: Url,
}

impl PortalClient {
    /// Create a client for the portal rooted at `base_url`.
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, ManifestError> {
        if base_url.cannot_be_a_base() {
            return Err(ManifestError::MalformedUrl {
                field: "portal_url".to_string(),
                value: base_url.to_string(),
            });
        }
        let events_url = base_url
            .join("events/")
            .map_err(|_| ManifestError::MalformedUrl {
                field: "portal_url".to_string(),
                value: base_url.to_string(),
            })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ManifestError::NetworkFailure(err.to_string()))?;
        Ok(Self { http, events_url })
    }

    /// URL of the event list.
    pub fn events_url(&self) -> &Url {
        &self.events_url
    }

    /// URL of a single event manifest.
    pub fn event_url(&self, event_id: &str) -> Url {
        let mut url = self.events_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(event_id).push("");
        }
        url
    }

    async fn get_json(&self, url: Url) -> Result<Value, ManifestError> {
        debug!(%url, "Fetching portal document");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| ManifestError::NetworkFailure(err.to_string()))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| ManifestError::NetworkFailure(err.to_string()))?;
        info!(%url, bytes = body.len(), "Portal document fetched");
        serde_json::from_slice(&body).map_err(|err| ManifestError::MalformedDocument(err.to_string()))
    }
}

#[async_trait]
impl ManifestClient for PortalClient {
    async fn fetch_event_list(&self) -> Result<Value, ManifestError> {
        self.get_json(self.events_url.clone()).await
    }

    async fn fetch_event_document(&self, event_id: &str) -> Result<Value, ManifestError> {
        self.get_json(self.event_url(event_id)).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Serve one canned HTTP response on a local port, returning the base URL
    /// and a handle yielding the raw request line.
    pub(crate) async fn serve_once(
        status: &'static str,
        body: String,
    ) -> anyhow::Result<(Url, tokio::task::JoinHandle<String>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return String::new();
            };
            let mut buffer = vec![0u8; 4096];
            let read = socket.read(&mut buffer).await.unwrap_or(0);
            let request = String::from_utf8_lossy(&buffer[..read]).to_string();
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
            request.lines().next().unwrap_or_default().to_string()
        });
        Ok((Url::parse(&format!("http://{addr}/"))?, handle))
    }

    #[test]
    fn builds_event_urls() -> anyhow::Result<()> {
        let client = PortalClient::new(
            &Url::parse("https://portal.opass.app/")?,
            Duration::from_secs(5),
        )?;
        assert_eq!(
            client.events_url().as_str(),
            "https://portal.opass.app/events/"
        );
        assert_eq!(
            client.event_url("SITCON_2019").as_str(),
            "https://portal.opass.app/events/SITCON_2019/"
        );
        assert_eq!(
            client.event_url("a b/c").as_str(),
            "https://portal.opass.app/events/a%20b%2Fc/"
        );
        Ok(())
    }

    #[test]
    fn rejects_non_base_url() -> anyhow::Result<()> {
        let result = PortalClient::new(&Url::parse("mailto:ops@example.com")?, Duration::from_secs(1));
        assert!(matches!(result, Err(ManifestError::MalformedUrl { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn fetches_event_document_over_http() -> anyhow::Result<()> {
        let (base, server) = serve_once("200 OK", r#"{"event_id":"X"}"#.to_string()).await?;
        let client = PortalClient::new(&base, Duration::from_secs(5))?;
        let document = client.fetch_event_document("X").await?;
        assert_eq!(document["event_id"], "X");
        assert_eq!(server.await?, "GET /events/X/ HTTP/1.1");
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_network_failure() -> anyhow::Result<()> {
        let (base, _server) = serve_once("503 Service Unavailable", "{}".to_string()).await?;
        let client = PortalClient::new(&base, Duration::from_secs(5))?;
        let result = client.fetch_event_list().await;
        assert!(matches!(result, Err(ManifestError::NetworkFailure(_))));
        Ok(())
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() -> anyhow::Result<()> {
        let (base, _server) = serve_once("200 OK", "<html></html>".to_string()).await?;
        let client = PortalClient::new(&base, Duration::from_secs(5))?;
        let result = client.fetch_event_list().await;
        assert!(matches!(result, Err(ManifestError::MalformedDocument(_))));
        Ok(())
    }
}
