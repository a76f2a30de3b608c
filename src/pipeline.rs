//! Bytes in, redaction result out
//!
//! One `process` call runs every stage in order: extract text, load the
//! policy, detect entities, redact, then attach context-hint metadata.
//! Each stage's error propagates as-is and no partial result is built.

use crate::config::{ContextHintsConfig, PiiGuardConfig};
use crate::error::Result;
use crate::extract::TextExtractor;
use crate::ocr::OcrClient;
use crate::privacy::{redact, Detection, EntityDetector, PolicyStore, PrivacyEngines};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Status of the optional context-enrichment integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextHints {
    pub enabled: bool,
    pub notes: String,
}

/// Report whether context enrichment is configured. Redaction never
/// depends on it.
pub fn context_hints(config: &ContextHintsConfig) -> ContextHints {
    if config.is_configured() {
        ContextHints {
            enabled: true,
            notes: "Azure OpenAI configured; policy-based redaction still authoritative"
                .to_string(),
        }
    } else {
        ContextHints {
            enabled: false,
            notes: "Azure OpenAI not configured".to_string(),
        }
    }
}

/// Result of one pipeline invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Content type as supplied by the caller
    pub content_type: String,
    /// Length of the extracted text in characters
    pub text_length: usize,
    /// Accepted detections in recognizer order
    pub entities: Vec<Detection>,
    pub redacted_text: String,
    pub ocr_meta_present: bool,
    #[serde(rename = "aoai_hints")]
    pub context_hints: ContextHints,
}

/// The detection-and-redaction pipeline
pub struct Pipeline {
    extractor: TextExtractor,
    policies: PolicyStore,
    engines: Arc<PrivacyEngines>,
    hints: ContextHintsConfig,
}

impl Pipeline {
    /// Build the pipeline from configuration and shared engines
    pub fn new(config: &PiiGuardConfig, engines: Arc<PrivacyEngines>) -> Result<Self> {
        let ocr = OcrClient::new(config.ocr.clone())?;
        Ok(Self::from_parts(
            TextExtractor::new(ocr, config.extraction),
            PolicyStore::new(config.policy.path.clone()),
            engines,
            config.context_hints.clone(),
        ))
    }

    /// Assemble the pipeline from already-built components
    pub fn from_parts(
        extractor: TextExtractor,
        policies: PolicyStore,
        engines: Arc<PrivacyEngines>,
        hints: ContextHintsConfig,
    ) -> Self {
        Self {
            extractor,
            policies,
            engines,
            hints,
        }
    }

    /// Get the policy store
    pub fn policy_store(&self) -> &PolicyStore {
        &self.policies
    }

    /// Run the full pipeline over `content`
    pub async fn process(&self, content: Bytes, content_type: &str) -> Result<PipelineResult> {
        tracing::info!(content_type, bytes = content.len(), "Starting redaction pipeline");

        let extraction = self.extractor.extract(content, content_type).await?;
        let text = extraction.text.as_str();
        let text_length = text.chars().count();
        tracing::debug!(text_length, route = ?extraction.route, "Text extracted");

        let policies = self.policies.load()?;

        let recognizer = self.engines.recognizer().await?;
        for name in policies.unsupported(&recognizer.supported_entities()) {
            tracing::warn!(
                entity = %name,
                recognizer = recognizer.name(),
                "Policy entity is not produced by the recognizer"
            );
        }

        let detections = EntityDetector::new(recognizer)
            .detect(text, &policies)
            .await?;

        let anonymizer = self.engines.anonymizer().await?;
        let redacted_text = redact(anonymizer.as_ref(), text, &policies, &detections)?.into_owned();

        let result = PipelineResult {
            content_type: content_type.to_string(),
            text_length,
            redacted_text,
            ocr_meta_present: extraction.has_ocr_metadata(),
            context_hints: context_hints(&self.hints),
            entities: detections,
        };

        tracing::info!(
            entities = result.entities.len(),
            "Redaction complete"
        );
        Ok(result)
    }
}
