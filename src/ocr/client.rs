//! Submit-then-poll client for the document intelligence read model

use super::flatten::flatten_read_result;
use super::transport::{HttpTransport, OcrTransport};
use crate::config::OcrConfig;
use crate::error::{Error, Result};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Path of the prebuilt read model's analyze operation
pub const READ_MODEL_PATH: &str = "/formrecognizer/documentModels/prebuilt-read:analyze";

const SUCCEEDED_STATES: &[&str] = &["succeeded", "success", "ok"];
const FAILED_STATES: &[&str] = &["failed", "error"];

/// Reference to an accepted analyze job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub operation_location: String,
}

/// What the service answered to a submission
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The result came back with the submission response
    Inline { raw: Value },
    /// The job runs asynchronously and must be polled
    Job(JobHandle),
}

/// Terminal state of a polled job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Job succeeded; `raw` is the final status body
    Completed { text: String, raw: Value },
    /// Service reported the job as failed
    Failed { reason: String },
    /// No terminal state within the attempt budget
    TimedOut { attempts: u32 },
}

/// Recognized text plus the raw structured result
#[derive(Debug, Clone, PartialEq)]
pub struct OcrDocument {
    pub text: String,
    pub raw: Value,
}

/// Client for the remote OCR service
pub struct OcrClient {
    config: OcrConfig,
    transport: Arc<dyn OcrTransport>,
}

impl OcrClient {
    /// Create a client over HTTP
    pub fn new(config: OcrConfig) -> Result<Self> {
        let transport =
            HttpTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: OcrConfig, transport: Arc<dyn OcrTransport>) -> Self {
        Self { config, transport }
    }

    /// Get the client configuration
    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    fn analyze_url(&self, endpoint: &str) -> String {
        format!(
            "{}{}?api-version={}",
            endpoint, READ_MODEL_PATH, self.config.api_version
        )
    }

    /// Submit a document for analysis.
    ///
    /// Credentials are checked before anything is sent.
    pub async fn submit(&self, content: Bytes, content_type: &str) -> Result<Submission> {
        let (endpoint, key) = self.config.credentials()?;
        let url = self.analyze_url(&endpoint);

        tracing::info!(
            content_type,
            bytes = content.len(),
            "Submitting document for OCR"
        );
        let response = self
            .transport
            .submit(&url, &key, content_type, content)
            .await?;

        if response.status != 200 && response.status != 202 {
            tracing::error!(status = response.status, "OCR analyze request rejected");
            return Err(Error::Ocr(format!(
                "analyze start failed: {} {}",
                response.status, response.body
            )));
        }

        if let Some(location) = response
            .operation_location
            .as_deref()
            .filter(|l| !l.trim().is_empty())
        {
            return Ok(Submission::Job(JobHandle {
                operation_location: location.to_string(),
            }));
        }

        let raw = response.json()?;
        if raw.get("result").is_some() {
            return Ok(Submission::Inline { raw });
        }

        Err(Error::Ocr(
            "operation-location missing in response".to_string(),
        ))
    }

    /// Poll a job until it reaches a terminal state or the attempt budget
    /// runs out.
    ///
    /// Non-200 responses and non-terminal states count as "not ready yet".
    /// The client sleeps `poll_interval_ms` between attempts but not after
    /// the last one.
    pub async fn poll(&self, handle: &JobHandle) -> Result<JobOutcome> {
        let (_, key) = self.config.credentials()?;
        let attempts = self.config.max_poll_attempts;
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        for attempt in 1..=attempts {
            let response = self
                .transport
                .status(&handle.operation_location, &key)
                .await?;

            if response.status == 200 {
                let body = response.json()?;
                let status = job_status(&body);

                if SUCCEEDED_STATES.contains(&status.as_str()) {
                    let text = body
                        .get("analyzeResult")
                        .filter(|v| !v.is_null())
                        .or_else(|| body.get("result").filter(|v| !v.is_null()))
                        .map(flatten_read_result)
                        .unwrap_or_default();
                    tracing::info!(attempt, chars = text.chars().count(), "OCR job succeeded");
                    return Ok(JobOutcome::Completed { text, raw: body });
                }

                if FAILED_STATES.contains(&status.as_str()) {
                    tracing::error!(attempt, "OCR job failed");
                    return Ok(JobOutcome::Failed {
                        reason: body.to_string(),
                    });
                }

                tracing::debug!(attempt, status = %status, "OCR job not finished");
            } else {
                tracing::debug!(attempt, http_status = response.status, "OCR status not ready");
            }

            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }

        tracing::warn!(attempts, "OCR polling timed out");
        Ok(JobOutcome::TimedOut { attempts })
    }

    /// Submit and, if needed, poll until the document text is available.
    ///
    /// Failed and timed-out jobs become `Error::Ocr`.
    pub async fn recognize(&self, content: Bytes, content_type: &str) -> Result<OcrDocument> {
        match self.submit(content, content_type).await? {
            Submission::Inline { raw } => {
                let text = raw
                    .get("result")
                    .map(flatten_read_result)
                    .unwrap_or_default();
                Ok(OcrDocument { text, raw })
            }
            Submission::Job(handle) => match self.poll(&handle).await? {
                JobOutcome::Completed { text, raw } => Ok(OcrDocument { text, raw }),
                JobOutcome::Failed { reason } => {
                    Err(Error::Ocr(format!("analyze failed: {}", reason)))
                }
                JobOutcome::TimedOut { attempts } => Err(Error::Ocr(format!(
                    "analyze polling timed out after {} attempts",
                    attempts
                ))),
            },
        }
    }
}

/// Lowercased `status`, falling back to `statusResult`
fn job_status(body: &Value) -> String {
    ["status", "statusResult"]
        .iter()
        .filter_map(|field| body.get(*field).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_lowercase()
}
