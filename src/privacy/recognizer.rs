//! Pluggable entity recognizer interface
//!
//! An `EntityRecognizer` is the named-entity-recognition capability used by
//! the detector: given a text and the entity types a policy asks for, it
//! returns typed spans with confidence scores.
//!
//! ```text
//! text + requested types → [EntityRecognizer] → Vec<RecognizerResult>
//!                                                   ↓
//!                                  EntityDetector (policy + context gate)
//! ```

use crate::error::Result;
use async_trait::async_trait;

/// A single span reported by a recognizer.
///
/// Offsets count characters (Unicode scalar values) and are end-exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizerResult {
    /// Entity type, e.g. `EMAIL_ADDRESS`
    pub entity_type: String,
    /// Start character offset
    pub start: usize,
    /// End character offset (exclusive)
    pub end: usize,
    /// Confidence score (0.0 to 1.0)
    pub score: f64,
}

impl RecognizerResult {
    /// Create a result
    pub fn new(entity_type: impl Into<String>, start: usize, end: usize, score: f64) -> Self {
        Self {
            entity_type: entity_type.into(),
            start,
            end,
            score,
        }
    }

    /// Span length in characters
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True for zero-width spans
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two spans share at least one character
    pub fn overlaps(&self, other: &RecognizerResult) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Named-entity-recognition capability.
///
/// Implementations may be regex tables, local models, or remote services.
/// They are shared read-only across concurrent pipeline runs.
#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    /// Find spans of the requested entity types in `text`.
    ///
    /// Types the recognizer does not support are ignored; an empty request
    /// yields no results.
    async fn analyze(&self, text: &str, entities: &[String]) -> Result<Vec<RecognizerResult>>;

    /// Entity types this recognizer can produce
    fn supported_entities(&self) -> Vec<String>;

    /// Human-readable name (used in logs)
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlaps() {
        let a = RecognizerResult::new("A", 0, 5, 0.9);
        let b = RecognizerResult::new("B", 4, 8, 0.9);
        let c = RecognizerResult::new("C", 5, 8, 0.9);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_len() {
        let r = RecognizerResult::new("A", 3, 10, 1.0);
        assert_eq!(r.len(), 7);
        assert!(!r.is_empty());
        assert!(RecognizerResult::new("A", 3, 3, 1.0).is_empty());
    }
}
