//! PiiGuard error types

use thiserror::Error;

/// PiiGuard error type
#[derive(Error, Debug)]
pub enum Error {
    /// Required external-service configuration is absent or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// OCR submission rejected, job failed, or polling timed out
    #[error("OCR error: {0}")]
    Ocr(String),

    /// Policy document missing, malformed, or invalid
    #[error("Policy error: {0}")]
    Policy(String),

    /// Content type refused by the extractor in strict mode
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Failure reported by the entity recognizer
    #[error("Recognizer error: {0}")]
    Recognizer(String),

    /// Failure reported by the anonymizer
    #[error("Anonymizer error: {0}")]
    Anonymizer(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Stable machine-readable code used by the HTTP surface
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::Ocr(_) => "OCR_ERROR",
            Error::Policy(_) => "POLICY_ERROR",
            Error::UnsupportedContentType(_) => "UNSUPPORTED_CONTENT_TYPE",
            Error::Recognizer(_) => "RECOGNIZER_ERROR",
            Error::Anonymizer(_) => "ANONYMIZER_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Http(_) => "HTTP_ERROR",
        }
    }
}

/// Result type alias for PiiGuard operations
pub type Result<T> = std::result::Result<T, Error>;
