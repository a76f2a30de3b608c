//! PiiGuard - PII detection and redaction for documents
//!
//! PiiGuard turns uploaded bytes (plain text, PDFs, scanned images) into
//! redacted text plus a structured list of detections, driven by a
//! declarative YAML policy.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                 Transport (HTTP API / CLI)                        │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │ bytes + content type
//! ┌───────────────────────────────▼──────────────────────────────────┐
//! │                         Pipeline                                  │
//! │  ┌────────────────────┐      ┌─────────────────────────────────┐ │
//! │  │   Text Extractor   │─────▶│  OCR Job Client                 │ │
//! │  │  - text/* decoding │      │  - submit, then poll            │ │
//! │  │  - PDF / images    │◀─────│  - flatten pages → lines        │ │
//! │  └─────────┬──────────┘      └─────────────────────────────────┘ │
//! │            │ text                                                 │
//! │  ┌─────────▼──────────┐      ┌─────────────────────────────────┐ │
//! │  │  Entity Detector   │◀─────│  Policy Store (YAML)            │ │
//! │  │  - recognizer call │      │  - replacement tokens           │ │
//! │  │  - context gate    │      │  - keyword gates                │ │
//! │  └─────────┬──────────┘      └─────────────────────────────────┘ │
//! │            │ detections                                           │
//! │  ┌─────────▼──────────┐                                           │
//! │  │     Anonymizer     │──▶ redacted text + detections             │
//! │  └────────────────────┘                                           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The recognizer and anonymizer are shared, lazily-initialised engines
//! ([`privacy::PrivacyEngines`]); everything else lives for one call.
//!
//! ## Modules
//!
//! - [`pipeline`]: End-to-end orchestration
//! - [`extract`]: Content-type dispatch and text decoding
//! - [`ocr`]: Remote OCR job client
//! - [`privacy`]: Policy, detection and anonymization
//! - [`api`]: HTTP surface
//! - [`config`]: Configuration management

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod ocr;
pub mod pipeline;
pub mod privacy;

pub use config::PiiGuardConfig;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineResult};
