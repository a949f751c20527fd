//! Connection to the generation service.
//!
//! [`GenerationService::open`] and reads from the returned body are the only
//! places a run can block without bound. The HTTP client is built with no
//! timeout: the service streams progress for as long as generation takes.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use tracing::{info, warn};

use crate::decoder::ByteStream;
use crate::error::ItemError;
use crate::request::GenerationRequest;

/// Opens a generation call and hands back the streaming response body.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn open(&self, request: &GenerationRequest) -> Result<ByteStream, ItemError>;
}

/// HTTP implementation posting JSON to a fixed endpoint.
pub struct HttpGenerationClient {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl HttpGenerationClient {
    pub fn new(endpoint: url::Url) -> Self {
        // reqwest applies no overall timeout unless one is configured.
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    async fn open(&self, request: &GenerationRequest) -> Result<ByteStream, ItemError> {
        let body = serde_json::to_vec(request).map_err(ItemError::RequestConstruction)?;

        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(ItemError::Transport)?;

        let status = resp.status();
        info!(status = status.as_u16(), "Response Status: {}", status.as_u16());

        if status != reqwest::StatusCode::OK {
            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to read error response body: {}", e);
                    format!("<failed to read response body: {}>", e)
                }
            };
            return Err(ItemError::NonSuccessStatus {
                status: status.as_u16(),
                body,
            });
        }

        let stream = resp
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        Ok(Box::pin(stream))
    }
}
