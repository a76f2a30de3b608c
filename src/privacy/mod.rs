//! PII detection and redaction
//!
//! Policy-driven detection over a pluggable recognizer, followed by
//! redaction through a pluggable anonymizer:
//! - YAML policy store (entity types, replacement tokens, keyword gates)
//! - Entity recognizer capability with a built-in pattern recognizer
//! - Detector applying policy authority and context gating
//! - Anonymizer capability with a built-in replace anonymizer
//! - Shared, lazily-initialised engines

pub mod anonymizer;
pub mod detector;
pub mod engines;
pub mod patterns;
pub mod policy;
pub mod recognizer;
pub mod span;

pub use anonymizer::{redact, Anonymizer, Operator, ReplaceAnonymizer};
pub use detector::{passes_context_gate, Detection, EntityDetector, Span};
pub use engines::{build_recognizer, PrivacyEngines};
pub use patterns::PatternRecognizer;
pub use policy::{load_policy, EntityPolicy, PolicySet, PolicyStore, DEFAULT_REPLACEMENT};
pub use recognizer::{EntityRecognizer, RecognizerResult};
