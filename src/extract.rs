//! Content-type dispatch from raw bytes to plain text
//!
//! Text-like payloads are decoded locally. PDFs and raster images go
//! through the OCR client. Anything else is either sent to OCR with a
//! warning (permissive mode) or refused (strict mode).

use crate::config::{DecodeFallback, ExtractionConfig, UnknownContentMode};
use crate::error::{Error, Result};
use crate::ocr::OcrClient;
use bytes::Bytes;
use serde_json::Value;

/// Raster image types accepted by the OCR service
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/webp",
    "image/tiff",
];

/// How a content type is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `text/*` or `application/json`
    Text,
    /// PDF or a supported image
    Document,
    /// Anything else
    Unknown,
}

/// The path an extraction actually took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionRoute {
    /// Decoded locally
    Text,
    /// Recognized document sent to OCR
    Ocr,
    /// Unknown content sent to OCR under the permissive mode
    PermissiveOcr,
}

/// Extracted text with optional OCR metadata
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    /// Raw structured OCR result, absent for locally decoded text
    pub ocr_metadata: Option<Value>,
    pub route: ExtractionRoute,
}

impl Extraction {
    /// True when OCR produced a non-empty JSON object
    pub fn has_ocr_metadata(&self) -> bool {
        matches!(&self.ocr_metadata, Some(Value::Object(map)) if !map.is_empty())
    }
}

/// Lowercased media type without parameters
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Classify a `Content-Type` header value
pub fn classify(content_type: &str) -> ContentKind {
    let essence = essence(content_type);
    if essence.starts_with("text/") || essence == "application/json" {
        ContentKind::Text
    } else if essence == "application/pdf" || SUPPORTED_IMAGE_TYPES.contains(&essence.as_str()) {
        ContentKind::Document
    } else {
        ContentKind::Unknown
    }
}

/// Decode text bytes: UTF-8 when valid, otherwise the configured fallback.
/// Never fails.
pub fn decode_text(content: &[u8], fallback: DecodeFallback) -> String {
    match std::str::from_utf8(content) {
        Ok(text) => text.to_string(),
        Err(_) => {
            tracing::debug!(?fallback, "Text payload is not valid UTF-8");
            match fallback {
                DecodeFallback::Ignore => content
                    .utf8_chunks()
                    .map(|chunk| chunk.valid())
                    .collect(),
                DecodeFallback::Latin1 => content.iter().map(|&b| char::from(b)).collect(),
            }
        }
    }
}

/// Turns uploaded bytes into text
pub struct TextExtractor {
    ocr: OcrClient,
    config: ExtractionConfig,
}

impl TextExtractor {
    pub fn new(ocr: OcrClient, config: ExtractionConfig) -> Self {
        Self { ocr, config }
    }

    /// Extract text from `content` declared as `content_type`
    pub async fn extract(&self, content: Bytes, content_type: &str) -> Result<Extraction> {
        let route = match classify(content_type) {
            ContentKind::Text => {
                let text = decode_text(&content, self.config.decode_fallback);
                return Ok(Extraction {
                    text,
                    ocr_metadata: None,
                    route: ExtractionRoute::Text,
                });
            }
            ContentKind::Document => ExtractionRoute::Ocr,
            ContentKind::Unknown => match self.config.unknown_content {
                UnknownContentMode::Permissive => {
                    tracing::warn!(
                        content_type,
                        "Unknown content type, attempting OCR"
                    );
                    ExtractionRoute::PermissiveOcr
                }
                UnknownContentMode::Strict => {
                    return Err(Error::UnsupportedContentType(content_type.to_string()));
                }
            },
        };

        let document = self.ocr.recognize(content, content_type).await?;
        Ok(Extraction {
            text: document.text,
            ocr_metadata: Some(document.raw),
            route,
        })
    }
}
