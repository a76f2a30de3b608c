//! PiiGuard configuration management
//!
//! Configuration is assembled once at process start from built-in defaults,
//! an optional TOML file, and environment variables (highest precedence),
//! then handed to each component by reference.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Document Intelligence API version used for the read model
pub const DEFAULT_OCR_API_VERSION: &str = "2023-07-31";

/// Default location of the redaction policy document
pub const DEFAULT_POLICY_PATH: &str = "policies/redaction_policy.yaml";

/// Default entity recognizer model id
pub const DEFAULT_NER_MODEL: &str = "pattern-en";

const MASK: &str = "****";

/// Main PiiGuard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PiiGuardConfig {
    /// Remote OCR service configuration
    pub ocr: OcrConfig,

    /// Entity recognizer configuration
    pub ner: NerConfig,

    /// Policy document configuration
    pub policy: PolicyConfig,

    /// Text extraction behavior
    pub extraction: ExtractionConfig,

    /// Optional secondary context-enrichment integration
    pub context_hints: ContextHintsConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Remote OCR (document intelligence) configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Service endpoint, e.g. `https://<resource>.cognitiveservices.azure.com`
    pub endpoint: Option<String>,

    /// Subscription key sent as `Ocp-Apim-Subscription-Key`
    pub api_key: Option<String>,

    /// API version query parameter
    pub api_version: String,

    /// Maximum number of status polls before giving up
    pub max_poll_attempts: u32,

    /// Delay between polls in milliseconds
    pub poll_interval_ms: u64,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            api_version: DEFAULT_OCR_API_VERSION.to_string(),
            max_poll_attempts: 60,
            poll_interval_ms: 1000,
            request_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| MASK))
            .field("api_version", &self.api_version)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl OcrConfig {
    /// Resolve the endpoint (without trailing slash) and subscription key.
    ///
    /// Fails with `Error::Config` when either is missing, so callers can
    /// check before any network call is attempted.
    pub fn credentials(&self) -> Result<(String, String)> {
        let endpoint = non_empty(self.endpoint.as_deref()).ok_or_else(|| {
            Error::Config("OCR endpoint not set (AZURE_DI_ENDPOINT)".to_string())
        })?;
        let key = non_empty(self.api_key.as_deref())
            .ok_or_else(|| Error::Config("OCR key not set (AZURE_DI_KEY)".to_string()))?;
        Ok((endpoint.trim_end_matches('/').to_string(), key.to_string()))
    }
}

/// Entity recognizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NerConfig {
    /// Recognizer model identifier
    pub model: String,
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_NER_MODEL.to_string(),
        }
    }
}

/// Policy document configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Path to the YAML policy document
    pub path: PathBuf,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_POLICY_PATH),
        }
    }
}

/// What the extractor does with content types it does not recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownContentMode {
    /// Log a warning and treat the payload as a document for OCR
    #[default]
    Permissive,
    /// Refuse the payload with `Error::UnsupportedContentType`
    Strict,
}

/// How text payloads that are not valid UTF-8 are decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFallback {
    /// Drop undecodable byte sequences
    #[default]
    Ignore,
    /// Decode every byte as one Latin-1 character
    Latin1,
}

/// Text extraction configuration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Handling of unrecognized content types
    pub unknown_content: UnknownContentMode,

    /// Decoding strategy for invalid UTF-8 text payloads
    pub decode_fallback: DecodeFallback,
}

/// Optional context-enrichment (Azure OpenAI) integration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextHintsConfig {
    /// Service endpoint
    pub endpoint: Option<String>,

    /// API key
    pub api_key: Option<String>,

    /// Model deployment name
    pub deployment: Option<String>,
}

impl fmt::Debug for ContextHintsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHintsConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| MASK))
            .field("deployment", &self.deployment)
            .finish()
    }
}

impl ContextHintsConfig {
    /// True when endpoint, key and deployment are all present
    pub fn is_configured(&self) -> bool {
        non_empty(self.endpoint.as_deref()).is_some()
            && non_empty(self.api_key.as_deref()).is_some()
            && non_empty(self.deployment.as_deref()).is_some()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,

    /// Allowed CORS origins (empty allows any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_upload_bytes: 25 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl PiiGuardConfig {
    /// Load configuration: defaults, then the optional TOML file, then the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        base.with_env(|name| std::env::var(name).ok())
    }

    /// Parse a TOML configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid config: {}", e)))
    }

    /// Overlay environment variables using the given lookup.
    ///
    /// Empty values are treated as unset.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AZURE_DI_ENDPOINT") {
            self.ocr.endpoint = Some(v);
        }
        if let Some(v) = get("AZURE_DI_KEY") {
            self.ocr.api_key = Some(v);
        }
        if let Some(v) = get("NER_MODEL") {
            self.ner.model = v;
        }
        if let Some(v) = get("POLICY_PATH") {
            self.policy.path = PathBuf::from(v);
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v.to_lowercase();
        }
        if let Some(v) = get("AZURE_OPENAI_ENDPOINT") {
            self.context_hints.endpoint = Some(v);
        }
        if let Some(v) = get("AZURE_OPENAI_API_KEY") {
            self.context_hints.api_key = Some(v);
        }
        if let Some(v) = get("AZURE_OPENAI_DEPLOYMENT") {
            self.context_hints.deployment = Some(v);
        }
        if let Some(v) = get("PIIGUARD_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PIIGUARD_PORT") {
            self.server.port = v
                .parse()
                .map_err(|_| Error::Config(format!("PIIGUARD_PORT is not a valid port: {}", v)))?;
        }

        Ok(self)
    }

    /// Copy of this configuration with secrets replaced by a mask,
    /// suitable for printing.
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        if copy.ocr.api_key.is_some() {
            copy.ocr.api_key = Some(MASK.to_string());
        }
        if copy.context_hints.api_key.is_some() {
            copy.context_hints.api_key = Some(MASK.to_string());
        }
        copy
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
