//! Policy-driven entity detection
//!
//! Runs the recognizer once over the full text for the policy's entity
//! types, then filters its raw spans:
//!
//! 1. Spans whose type has no policy are dropped (the policy is authoritative).
//! 2. Spans whose policy carries context keywords are kept only when one of
//!    the keywords appears, case-insensitively, within `window` characters.
//!
//! Survivors become `Detection` records with a short review snippet.

use super::policy::{EntityPolicy, PolicySet};
use super::recognizer::{EntityRecognizer, RecognizerResult};
use super::span::CharIndex;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Characters of surrounding text included in `context_snippet`
pub const SNIPPET_RADIUS: usize = 20;

/// End-exclusive character span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// An accepted PII match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Entity type
    #[serde(rename = "entity")]
    pub entity_type: String,
    /// Original text covered by the span
    #[serde(rename = "match")]
    pub matched_text: String,
    /// Character span in the extracted text
    pub span: Span,
    /// Recognizer confidence (0.0 to 1.0)
    pub score: f64,
    /// Original-case text around the match, for human review
    #[serde(rename = "context")]
    pub context_snippet: String,
}

impl Detection {
    /// Back to the recognizer's representation, for the anonymizer
    pub fn to_recognizer_result(&self) -> RecognizerResult {
        RecognizerResult::new(
            self.entity_type.clone(),
            self.span.start,
            self.span.end,
            self.score,
        )
    }
}

/// Detects policy-enabled entities using a shared recognizer
pub struct EntityDetector {
    recognizer: Arc<dyn EntityRecognizer>,
}

impl EntityDetector {
    /// Create a detector over the given recognizer
    pub fn new(recognizer: Arc<dyn EntityRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Detect entities in `text` under `policies`.
    ///
    /// Empty text returns immediately without calling the recognizer.
    /// Output order follows the recognizer's result order.
    pub async fn detect(&self, text: &str, policies: &PolicySet) -> Result<Vec<Detection>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let targets = policies.names();
        let raw = self.recognizer.analyze(text, &targets).await?;
        let index = CharIndex::new(text);
        let text_len = index.char_len();

        let mut detections = Vec::with_capacity(raw.len());
        let mut gated = 0usize;

        for result in raw {
            let Some(policy) = policies.get(&result.entity_type) else {
                continue;
            };

            if result.start > result.end || result.end > text_len {
                return Err(Error::Recognizer(format!(
                    "{} returned span {}..{} outside text of length {}",
                    self.recognizer.name(),
                    result.start,
                    result.end,
                    text_len
                )));
            }

            if !passes_context_gate(&index, &result, policy) {
                gated += 1;
                continue;
            }

            detections.push(Detection {
                entity_type: result.entity_type.clone(),
                matched_text: index.slice(result.start, result.end).to_string(),
                span: Span {
                    start: result.start,
                    end: result.end,
                },
                score: result.score,
                context_snippet: index
                    .window(result.start, result.end, SNIPPET_RADIUS)
                    .to_string(),
            });
        }

        tracing::debug!(
            recognizer = self.recognizer.name(),
            accepted = detections.len(),
            gated,
            "Entity detection finished"
        );

        Ok(detections)
    }
}

/// Keyword gate for policies with context keywords.
///
/// Policies without keywords always pass. Otherwise the lowercased window
/// `[start - window, end + window]`, clamped to the text, must contain one
/// of the keywords as a substring.
pub fn passes_context_gate(
    index: &CharIndex<'_>,
    result: &RecognizerResult,
    policy: &EntityPolicy,
) -> bool {
    if !policy.has_context_gate() {
        return true;
    }
    let window = index
        .window(result.start, result.end, policy.window)
        .to_lowercase();
    policy
        .context_keywords
        .iter()
        .any(|keyword| window.contains(keyword.as_str()))
}
