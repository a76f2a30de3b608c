//! Regex-based entity recognizer
//!
//! Built-in recognizer (model id `pattern-en`) covering the structured PII
//! types that can be found reliably with patterns plus checksum or range
//! validation. Free-form types such as person names need a model-backed
//! `EntityRecognizer`.

use super::recognizer::{EntityRecognizer, RecognizerResult};
use super::span::CharIndex;
use crate::error::{Error, Result};
use async_trait::async_trait;
use regex::Regex;

/// Model id of the built-in recognizer
pub const PATTERN_MODEL_ID: &str = "pattern-en";

const MONTHS: &str = "jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

/// Declarative rule before compilation
struct PatternSpec {
    entity: &'static str,
    pattern: String,
    score: f64,
    validate: Option<fn(&str) -> bool>,
}

struct CompiledRule {
    entity: &'static str,
    pattern: Regex,
    score: f64,
    validate: Option<fn(&str) -> bool>,
}

/// Regex-backed `EntityRecognizer`
pub struct PatternRecognizer {
    rules: Vec<CompiledRule>,
}

impl PatternRecognizer {
    /// Compile the built-in rule table
    pub fn new() -> Result<Self> {
        let rules = default_patterns()
            .into_iter()
            .map(|spec| {
                let pattern = Regex::new(&spec.pattern).map_err(|e| {
                    Error::Recognizer(format!(
                        "Invalid regex pattern for entity '{}': {}",
                        spec.entity, e
                    ))
                })?;
                Ok(CompiledRule {
                    entity: spec.entity,
                    pattern,
                    score: spec.score,
                    validate: spec.validate,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Synchronous core of `analyze`
    pub fn find(&self, text: &str, entities: &[String]) -> Vec<RecognizerResult> {
        let index = CharIndex::new(text);
        let mut results: Vec<RecognizerResult> = Vec::new();

        for rule in self
            .rules
            .iter()
            .filter(|r| entities.iter().any(|e| e == r.entity))
        {
            for mat in rule.pattern.find_iter(text) {
                if let Some(validate) = rule.validate {
                    if !validate(mat.as_str()) {
                        continue;
                    }
                }
                let result = RecognizerResult::new(
                    rule.entity,
                    index.char_offset(mat.start()),
                    index.char_offset(mat.end()),
                    rule.score,
                );
                // Several date layouts can hit the same span
                if !results.iter().any(|r| {
                    r.entity_type == result.entity_type
                        && r.start == result.start
                        && r.end == result.end
                }) {
                    results.push(result);
                }
            }
        }

        results.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
        results
    }
}

#[async_trait]
impl EntityRecognizer for PatternRecognizer {
    async fn analyze(&self, text: &str, entities: &[String]) -> Result<Vec<RecognizerResult>> {
        Ok(self.find(text, entities))
    }

    fn supported_entities(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for rule in &self.rules {
            if !names.iter().any(|n| n == rule.entity) {
                names.push(rule.entity.to_string());
            }
        }
        names
    }

    fn name(&self) -> &str {
        PATTERN_MODEL_ID
    }
}

fn default_patterns() -> Vec<PatternSpec> {
    vec![
        PatternSpec {
            entity: "EMAIL_ADDRESS",
            pattern: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}\b"
                .to_string(),
            score: 1.0,
            validate: None,
        },
        PatternSpec {
            entity: "PHONE_NUMBER",
            pattern: r"(?:\+?1[-.\s]?)?(?:\(\d{3}\)\s?|\b\d{3}[-.\s]?)\d{3}[-.\s]?\d{4}\b"
                .to_string(),
            score: 0.75,
            validate: None,
        },
        PatternSpec {
            entity: "US_SSN",
            pattern: r"\b\d{3}[- ]\d{2}[- ]\d{4}\b".to_string(),
            score: 0.85,
            validate: Some(valid_ssn),
        },
        PatternSpec {
            entity: "CREDIT_CARD",
            pattern: r"\b(?:\d[ -]?){12,18}\d\b".to_string(),
            score: 1.0,
            validate: Some(luhn_valid),
        },
        PatternSpec {
            entity: "DATE_TIME",
            pattern: r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b".to_string(),
            score: 0.6,
            validate: None,
        },
        PatternSpec {
            entity: "DATE_TIME",
            pattern: r"\b\d{4}-\d{2}-\d{2}\b".to_string(),
            score: 0.6,
            validate: None,
        },
        PatternSpec {
            entity: "DATE_TIME",
            pattern: format!(
                r"(?i)\b(?:{months})\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}\b",
                months = MONTHS
            ),
            score: 0.6,
            validate: None,
        },
        PatternSpec {
            entity: "DATE_TIME",
            pattern: format!(
                r"(?i)\b\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{months})\.?,?\s+\d{{4}}\b",
                months = MONTHS
            ),
            score: 0.6,
            validate: None,
        },
        PatternSpec {
            entity: "IP_ADDRESS",
            pattern: r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\b"
                .to_string(),
            score: 0.6,
            validate: None,
        },
        PatternSpec {
            entity: "URL",
            pattern: r#"\b(?:https?://|www\.)[^\s<>"']*[^\s<>"'.,;:!?)]"#.to_string(),
            score: 0.5,
            validate: None,
        },
    ]
}

/// Reject SSNs with mixed delimiters or reserved area/group/serial numbers
fn valid_ssn(candidate: &str) -> bool {
    let delimiters: Vec<char> = candidate.chars().filter(|c| !c.is_ascii_digit()).collect();
    if delimiters.windows(2).any(|w| w[0] != w[1]) {
        return false;
    }

    let digits: String = candidate.chars().filter(|c| c.is_ascii_digit()).collect();
    let (area, rest) = digits.split_at(3);
    let (group, serial) = rest.split_at(2);

    area != "000" && area != "666" && !area.starts_with('9') && group != "00" && serial != "0000"
}

/// Luhn checksum over the digits of a candidate card number
fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}
