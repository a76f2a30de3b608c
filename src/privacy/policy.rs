//! Redaction policy document and store
//!
//! The policy names which entity types are reported and redacted, the
//! replacement token for each, and an optional keyword gate:
//!
//! ```yaml
//! version: 1
//! entities:
//!   - name: DATE_TIME
//!     replace_with: "[DOB_REDACTED]"
//!     context:
//!       only_if_near_any: ["dob", "birth"]
//!       window: 25
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Replacement token used when an entry omits `replace_with`
pub const DEFAULT_REPLACEMENT: &str = "[REDACTED]";

/// Redaction policy for a single entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityPolicy {
    /// Entity type as reported by the recognizer, e.g. `US_SSN`
    pub name: String,
    /// Token substituted for every accepted match
    pub replace_with: String,
    /// Lowercased keywords; when non-empty a match is kept only if one of
    /// them occurs within `window` characters of it
    pub context_keywords: BTreeSet<String>,
    /// Character radius searched for context keywords
    pub window: usize,
}

impl EntityPolicy {
    /// Policy with the given replacement and no context gate
    pub fn new(name: impl Into<String>, replace_with: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replace_with: replace_with.into(),
            context_keywords: BTreeSet::new(),
            window: 0,
        }
    }

    /// Gate matches on nearby keywords (case-insensitive)
    pub fn with_context<I, S>(mut self, keywords: I, window: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.context_keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .collect();
        self.window = window;
        self
    }

    /// Whether matches of this type must pass the keyword gate
    pub fn has_context_gate(&self) -> bool {
        !self.context_keywords.is_empty()
    }
}

/// The set of entity policies loaded from one policy document.
///
/// Entity names are unique; iteration follows document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicySet {
    version: Option<u32>,
    entities: Vec<EntityPolicy>,
}

impl PolicySet {
    /// Build a policy set; a later entry replaces an earlier one with the
    /// same name.
    pub fn new(entities: Vec<EntityPolicy>) -> Self {
        let mut set = Self::default();
        for policy in entities {
            set.insert(policy);
        }
        set
    }

    fn insert(&mut self, policy: EntityPolicy) {
        if let Some(existing) = self.entities.iter_mut().find(|p| p.name == policy.name) {
            tracing::warn!(
                entity = %policy.name,
                "Duplicate entity in policy, later entry wins"
            );
            *existing = policy;
        } else {
            self.entities.push(policy);
        }
    }

    /// Document version, if the document declares one
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Look up the policy for an entity type
    pub fn get(&self, entity_type: &str) -> Option<&EntityPolicy> {
        self.entities.iter().find(|p| p.name == entity_type)
    }

    /// Entity type names, in document order
    pub fn names(&self) -> Vec<String> {
        self.entities.iter().map(|p| p.name.clone()).collect()
    }

    /// Iterate over the policies
    pub fn iter(&self) -> impl Iterator<Item = &EntityPolicy> {
        self.entities.iter()
    }

    /// Number of entity policies
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when the policy enables no entity types
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Policy names the recognizer cannot produce
    pub fn unsupported(&self, supported: &[String]) -> Vec<String> {
        self.entities
            .iter()
            .filter(|p| !supported.iter().any(|s| s == &p.name))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Parse a YAML policy document
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: Option<RawDocument> = serde_yaml::from_str(content)
            .map_err(|e| Error::Policy(format!("malformed policy document: {}", e)))?;
        let Some(raw) = raw else {
            return Ok(Self::default());
        };

        let mut set = Self {
            version: raw.version,
            entities: Vec::new(),
        };

        for (index, entry) in raw.entities.unwrap_or_default().into_iter().enumerate() {
            let name = entry
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    Error::Policy(format!("entity entry #{} is missing a name", index + 1))
                })?;

            let context = entry.context.unwrap_or_default();
            let window = usize::try_from(context.window).map_err(|_| {
                Error::Policy(format!(
                    "entity '{}' has a negative context window: {}",
                    name, context.window
                ))
            })?;

            let policy = EntityPolicy::new(
                name,
                entry
                    .replace_with
                    .unwrap_or_else(|| DEFAULT_REPLACEMENT.to_string()),
            )
            .with_context(context.only_if_near_any, window);

            set.insert(policy);
        }

        Ok(set)
    }
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    entities: Option<Vec<RawEntity>>,
}

#[derive(Deserialize)]
struct RawEntity {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    replace_with: Option<String>,
    #[serde(default)]
    context: Option<RawContext>,
}

#[derive(Default, Deserialize)]
struct RawContext {
    #[serde(default)]
    only_if_near_any: Vec<String>,
    #[serde(default)]
    window: i64,
}

/// Loads the policy document from a fixed path.
///
/// The document is read on every `load` call; nothing is cached.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    path: PathBuf,
}

impl PolicyStore {
    /// Create a store reading from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the policy document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the policy document
    pub fn load(&self) -> Result<PolicySet> {
        load_policy(&self.path)
    }
}

/// Read and validate a policy document from disk
pub fn load_policy(path: &Path) -> Result<PolicySet> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Policy(format!("cannot read policy {}: {}", path.display(), e))
    })?;
    let set = PolicySet::from_yaml(&content)?;
    tracing::info!(
        path = %path.display(),
        entities = set.len(),
        "Loaded redaction policy"
    );
    Ok(set)
}
