//! HTTP transport for the OCR service
//!
//! The job client talks to the service through `OcrTransport` so the
//! submit/poll protocol can be exercised without a network.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;

/// Header carrying the subscription key
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Header pointing at the asynchronous job
pub const OPERATION_LOCATION_HEADER: &str = "operation-location";

/// The parts of an HTTP response the job protocol looks at
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// `operation-location` header, if present
    pub operation_location: Option<String>,
    /// Raw response body
    pub body: String,
}

impl TransportResponse {
    /// Parse the body as JSON
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.body).map_err(|e| {
            Error::Ocr(format!(
                "invalid JSON in OCR response (status {}): {}",
                self.status, e
            ))
        })
    }
}

/// Wire access to the OCR service
#[async_trait]
pub trait OcrTransport: Send + Sync {
    /// POST the document bytes to the analyze endpoint
    async fn submit(
        &self,
        url: &str,
        api_key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<TransportResponse>;

    /// GET the job status
    async fn status(&self, url: &str, api_key: &str) -> Result<TransportResponse>;
}

/// `OcrTransport` backed by reqwest
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn into_transport_response(response: reqwest::Response) -> Result<TransportResponse> {
        let status = response.status().as_u16();
        let operation_location = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(TransportResponse {
            status,
            operation_location,
            body,
        })
    }
}

#[async_trait]
impl OcrTransport for HttpTransport {
    async fn submit(
        &self,
        url: &str,
        api_key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<TransportResponse> {
        let response = self
            .client
            .post(url)
            .header(SUBSCRIPTION_KEY_HEADER, api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        Self::into_transport_response(response).await
    }

    async fn status(&self, url: &str, api_key: &str) -> Result<TransportResponse> {
        let response = self
            .client
            .get(url)
            .header(SUBSCRIPTION_KEY_HEADER, api_key)
            .send()
            .await?;
        Self::into_transport_response(response).await
    }
}
