//! Anonymization capability and the redaction stage
//!
//! The `Anonymizer` owns all span surgery: it receives the full set of
//! accepted spans at once and produces one consistent rewritten string,
//! resolving overlapping and adjacent spans itself. `redact` only maps the
//! policy to operators and hands everything over in a single call.

use super::detector::Detection;
use super::policy::PolicySet;
use super::recognizer::RecognizerResult;
use super::span::CharIndex;
use crate::error::{Error, Result};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;

/// How a span of a given entity type is rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    /// Substitute a fixed value
    Replace { new_value: String },
}

/// Anonymization capability: text + spans + per-type operators → new text
pub trait Anonymizer: Send + Sync {
    /// Rewrite `text`, applying `operators[entity_type]` to every span.
    ///
    /// Types without an operator are replaced with `<ENTITY_TYPE>`.
    fn anonymize(
        &self,
        text: &str,
        results: &[RecognizerResult],
        operators: &HashMap<String, Operator>,
    ) -> Result<String>;

    /// Human-readable name (used in logs)
    fn name(&self) -> &str;
}

/// Built-in anonymizer performing replace operations
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplaceAnonymizer;

impl ReplaceAnonymizer {
    /// Create the anonymizer
    pub fn new() -> Self {
        Self
    }
}

impl Anonymizer for ReplaceAnonymizer {
    fn anonymize(
        &self,
        text: &str,
        results: &[RecognizerResult],
        operators: &HashMap<String, Operator>,
    ) -> Result<String> {
        let index = CharIndex::new(text);
        let text_len = index.char_len();

        if let Some(bad) = results
            .iter()
            .find(|r| r.start > r.end || r.end > text_len)
        {
            return Err(Error::Anonymizer(format!(
                "span {}..{} ({}) is outside text of length {}",
                bad.start, bad.end, bad.entity_type, text_len
            )));
        }

        let kept = resolve_conflicts(results);

        // Rewrite back to front so earlier byte offsets stay valid
        let mut output = text.to_string();
        for result in kept.iter().rev() {
            let replacement = match operators.get(&result.entity_type) {
                Some(Operator::Replace { new_value }) => Cow::Borrowed(new_value.as_str()),
                None => Cow::Owned(format!("<{}>", result.entity_type)),
            };
            let start = index.byte_offset(result.start);
            let end = index.byte_offset(result.end);
            output.replace_range(start..end, &replacement);
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "replace"
    }
}

/// Merge overlapping spans into non-overlapping ones, ordered by start.
///
/// Each cluster of transitively overlapping spans becomes its union span,
/// so every covered character is rewritten. The union is labelled with its
/// highest-scoring member; on a tie the longer span wins, then the one
/// starting first. Adjacent spans do not overlap. Zero-width spans are
/// dropped.
fn resolve_conflicts(results: &[RecognizerResult]) -> Vec<RecognizerResult> {
    let mut sorted: Vec<&RecognizerResult> = results.iter().filter(|r| !r.is_empty()).collect();
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut merged: Vec<RecognizerResult> = Vec::new();
    let mut cluster: Option<(usize, usize, &RecognizerResult)> = None;

    for candidate in sorted {
        cluster = match cluster {
            Some((start, end, label)) if candidate.start < end => {
                let label = if outranks(candidate, label) { candidate } else { label };
                Some((start, end.max(candidate.end), label))
            }
            previous => {
                if let Some((start, end, label)) = previous {
                    merged.push(RecognizerResult::new(label.entity_type.clone(), start, end, label.score));
                }
                Some((candidate.start, candidate.end, candidate))
            }
        };
    }
    if let Some((start, end, label)) = cluster {
        merged.push(RecognizerResult::new(label.entity_type.clone(), start, end, label.score));
    }
    merged
}

/// Whether `candidate` should label a cluster instead of `current`
fn outranks(candidate: &RecognizerResult, current: &RecognizerResult) -> bool {
    match candidate
        .score
        .partial_cmp(&current.score)
        .unwrap_or(Ordering::Equal)
    {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => {
            candidate.len() > current.len()
                || (candidate.len() == current.len() && candidate.start < current.start)
        }
    }
}

/// Rewrite `text` by replacing every detection with its policy token.
///
/// With no detections the input is returned as-is. Otherwise the
/// anonymizer is invoked once with all spans.
pub fn redact<'a>(
    anonymizer: &dyn Anonymizer,
    text: &'a str,
    policies: &PolicySet,
    detections: &[Detection],
) -> Result<Cow<'a, str>> {
    if detections.is_empty() {
        return Ok(Cow::Borrowed(text));
    }

    let operators: HashMap<String, Operator> = policies
        .iter()
        .map(|p| {
            (
                p.name.clone(),
                Operator::Replace {
                    new_value: p.replace_with.clone(),
                },
            )
        })
        .collect();

    let results: Vec<RecognizerResult> = detections
        .iter()
        .map(Detection::to_recognizer_result)
        .collect();

    let redacted = anonymizer.anonymize(text, &results, &operators)?;
    tracing::debug!(
        anonymizer = anonymizer.name(),
        spans = results.len(),
        "Redaction applied"
    );
    Ok(Cow::Owned(redacted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privacy::detector::Span;
    use crate::privacy::policy::EntityPolicy;

    fn replace(pairs: &[(&str, &str)]) -> HashMap<String, Operator> {
        pairs
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    Operator::Replace {
                        new_value: v.to_string(),
                    },
                )
            })
            .collect()
    }

    fn detection(entity: &str, text: &str, start: usize, end: usize) -> Detection {
        Detection {
            entity_type: entity.to_string(),
            matched_text: text.chars().skip(start).take(end - start).collect(),
            span: Span { start, end },
            score: 0.9,
            context_snippet: String::new(),
        }
    }

    #[test]
    fn test_redact_identity_without_detections() {
        let text = "nothing to see here";
        let policies = PolicySet::new(vec![EntityPolicy::new("US_SSN", "[SSN]")]);
        let out = redact(&ReplaceAnonymizer, text, &policies, &[]).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, text);
    }

    #[test]
    fn test_redact_replaces_with_policy_tokens() {
        let text = "John's SSN is 123-45-6789 and email john.doe@example.com";
        let policies = PolicySet::new(vec![
            EntityPolicy::new("US_SSN", "[SSN_REDACTED]"),
            EntityPolicy::new("EMAIL_ADDRESS", "[EMAIL_REDACTED]"),
        ]);
        let detections = vec![
            detection("US_SSN", text, 14, 25),
            detection("EMAIL_ADDRESS", text, 36, 56),
        ];
        let out = redact(&ReplaceAnonymizer, text, &policies, &detections).unwrap();
        assert_eq!(
            out,
            "John's SSN is [SSN_REDACTED] and email [EMAIL_REDACTED]"
        );
    }

    #[test]
    fn test_adjacent_spans_both_replaced() {
        let text = "AAAABBBB";
        let results = vec![
            RecognizerResult::new("A", 0, 4, 0.5),
            RecognizerResult::new("B", 4, 8, 0.5),
        ];
        let out = ReplaceAnonymizer
            .anonymize(text, &results, &replace(&[("A", "[a]"), ("B", "[b]")]))
            .unwrap();
        assert_eq!(out, "[a][b]");
    }

    #[test]
    fn test_overlap_covers_union_with_best_token() {
        let text = "visit www.example.com/user@example.com now";
        let results = vec![
            RecognizerResult::new("URL", 6, 38, 0.5),
            RecognizerResult::new("EMAIL_ADDRESS", 22, 38, 1.0),
        ];
        let out = ReplaceAnonymizer
            .anonymize(
                text,
                &results,
                &replace(&[("URL", "[URL]"), ("EMAIL_ADDRESS", "[EMAIL]")]),
            )
            .unwrap();
        assert_eq!(out, "visit [EMAIL] now");
    }

    #[test]
    fn test_overlap_chain_is_merged() {
        let results = vec![
            RecognizerResult::new("A", 0, 10, 0.9),
            RecognizerResult::new("B", 2, 4, 0.5),
            RecognizerResult::new("C", 8, 12, 0.95),
        ];
        let out = ReplaceAnonymizer
            .anonymize(
                "0123456789ABCD",
                &results,
                &replace(&[("A", "[A]"), ("B", "[B]"), ("C", "[C]")]),
            )
            .unwrap();
        assert_eq!(out, "[C]CD");
    }

    #[test]
    fn test_disjoint_clusters_stay_separate() {
        let results = vec![
            RecognizerResult::new("X", 6, 9, 0.4),
            RecognizerResult::new("Y", 0, 3, 0.8),
            RecognizerResult::new("Z", 1, 2, 0.9),
        ];
        let out = ReplaceAnonymizer
            .anonymize("abcdefghij", &results, &replace(&[("X", "x"), ("Y", "y"), ("Z", "z")]))
            .unwrap();
        assert_eq!(out, "zdefxj");
    }

    #[tokio::test]
    async fn test_email_inside_url_leaves_nothing_in_clear() {
        use crate::privacy::{EntityDetector, PatternRecognizer};
        use std::sync::Arc;

        let text = "see https://example.com/profile?u=jo@example.com now";
        let policies = PolicySet::new(vec![
            EntityPolicy::new("URL", "[URL]"),
            EntityPolicy::new("EMAIL_ADDRESS", "[EMAIL]"),
        ]);
        let detector = EntityDetector::new(Arc::new(PatternRecognizer::new().unwrap()));
        let detections = detector.detect(text, &policies).await.unwrap();
        assert_eq!(detections.len(), 2);

        let out = redact(&ReplaceAnonymizer, text, &policies, &detections).unwrap();
        assert_eq!(out, "see [EMAIL] now");
        for detection in &detections {
            assert!(!out.contains(&detection.matched_text));
        }
    }

    #[test]
    fn test_overlap_tie_prefers_longer_span() {
        let text = "0123456789";
        let results = vec![
            RecognizerResult::new("SHORT", 2, 5, 0.7),
            RecognizerResult::new("LONG", 2, 9, 0.7),
        ];
        let out = ReplaceAnonymizer
            .anonymize(text, &results, &replace(&[("SHORT", "S"), ("LONG", "L")]))
            .unwrap();
        assert_eq!(out, "01L9");
    }

    #[test]
    fn test_missing_operator_uses_entity_tag() {
        let out = ReplaceAnonymizer
            .anonymize(
                "call 555-123-4567",
                &[RecognizerResult::new("PHONE_NUMBER", 5, 17, 0.75)],
                &HashMap::new(),
            )
            .unwrap();
        assert_eq!(out, "call <PHONE_NUMBER>");
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Zoë: zoe@example.fr ✓";
        let start = 5;
        let end = start + "zoe@example.fr".chars().count();
        let out = ReplaceAnonymizer
            .anonymize(
                text,
                &[RecognizerResult::new("EMAIL_ADDRESS", start, end, 1.0)],
                &replace(&[("EMAIL_ADDRESS", "[EMAIL]")]),
            )
            .unwrap();
        assert_eq!(out, "Zoë: [EMAIL] ✓");
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let err = ReplaceAnonymizer
            .anonymize("abc", &[RecognizerResult::new("X", 1, 10, 1.0)], &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, Error::Anonymizer(_)));
    }
}
