//! Transport abstraction for opening a generation stream

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tokio_stream::Stream;

use crate::error::{Error, Result};

/// Raw response body chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Opens one generation request and hands back its body as a byte stream
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `prompt` and return the response body once the server accepted the request
    async fn open(&self, prompt: &str) -> Result<ByteStream>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
}

/// HTTP transport posting `{"prompt": ...}` to `<base_url>/chat`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpTransport {
    /// Server address used when none is configured
    pub const DEFAULT_URL: &'static str = "http://localhost:8000";

    /// Create a transport for the given server address
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a transport whose connection attempts give up after `timeout`.
    ///
    /// Only connection establishment is bounded; a stalled response keeps streaming.
    pub fn with_connect_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;
        Self::with_client(base_url, client)
    }

    fn with_client(base_url: &str, client: reqwest::Client) -> Result<Self> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| Error::InvalidConfig(format!("invalid server url '{}': {}", base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::InvalidConfig(format!(
                "unsupported scheme '{}' (expected http or https)",
                base_url.scheme()
            )));
        }
        Ok(Self { client, base_url })
    }

    /// Full URL of the generation endpoint
    pub fn endpoint(&self) -> String {
        format!("{}/chat", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, prompt: &str) -> Result<ByteStream> {
        let url = self.endpoint();
        tracing::debug!("POST {} ({} chars)", url, prompt.chars().count());

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&ChatRequest { prompt })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status(status.as_u16(), body));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(Error::from));
        Ok(Box::pin(body))
    }
}
