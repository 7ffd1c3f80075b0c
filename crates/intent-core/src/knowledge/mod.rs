//! Knowledge base: the ordered set of intents and their recognition cues.
//!
//! ## File format
//!
//! A JSON object whose keys are intent names. Key order in the file is the
//! iteration order used for keyword matching and tie-breaking.
//!
//! ```json
//! {
//!   "greeting": { "golden_keywords": ["hola"], "examples": ["buenos días"] },
//!   "pricing":  ["cuánto cuesta una web", "precios"]
//! }
//! ```
//!
//! The second form (a bare list of examples, no keywords) is accepted for
//! knowledge bases written before golden keywords existed.

mod loader;

pub use loader::load_path;

use crate::error::KnowledgeBaseError;
use serde::{Deserialize, Serialize};

/// Recognition cues for one intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentSpec {
    /// Substring triggers, stored lowercased. Order is significant.
    #[serde(default)]
    pub golden_keywords: Vec<String>,
    /// Example utterances used for semantic scoring. May be empty.
    #[serde(default)]
    pub examples: Vec<String>,
}

impl IntentSpec {
    pub fn new<K, E>(golden_keywords: K, examples: E) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            golden_keywords: golden_keywords.into_iter().map(Into::into).collect(),
            examples: examples.into_iter().map(Into::into).collect(),
        }
    }

    /// Lowercases keywords and drops blank ones (an empty or whitespace keyword would match
    /// nearly every message).
    fn normalized(self, intent: &str) -> Self {
        let mut golden_keywords: Vec<String> = Vec::with_capacity(self.golden_keywords.len());
        for kw in self.golden_keywords {
            let kw = kw.to_lowercase();
            if kw.trim().is_empty() {
                tracing::warn!(target: "intent::knowledge", intent, "Ignoring blank golden keyword");
                continue;
            }
            if !golden_keywords.contains(&kw) {
                golden_keywords.push(kw);
            }
        }
        Self {
            golden_keywords,
            examples: self.examples,
        }
    }
}

/// Immutable, ordered mapping from intent name to [`IntentSpec`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBase {
    intents: Vec<(String, IntentSpec)>,
}

impl KnowledgeBase {
    /// Builds a knowledge base from ordered pairs. Fails on duplicate or empty names.
    pub fn from_intents<I>(intents: I) -> Result<Self, KnowledgeBaseError>
    where
        I: IntoIterator<Item = (String, IntentSpec)>,
    {
        let mut out: Vec<(String, IntentSpec)> = Vec::new();
        for (name, spec) in intents {
            if name.trim().is_empty() {
                return Err(KnowledgeBaseError::EmptyIntentName);
            }
            if out.iter().any(|(existing, _)| *existing == name) {
                return Err(KnowledgeBaseError::DuplicateIntent(name));
            }
            let spec = spec.normalized(&name);
            out.push((name, spec));
        }
        Ok(Self { intents: out })
    }

    /// Parses the JSON file format described in the module docs.
    pub fn from_json_str(json: &str) -> Result<Self, KnowledgeBaseError> {
        let raw: loader::RawKnowledgeBase = serde_json::from_str(json)?;
        Self::from_intents(raw.0)
    }

    /// Intents in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IntentSpec)> {
        self.intents.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn get(&self, name: &str) -> Option<&IntentSpec> {
        self.intents
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Total number of example utterances across all intents.
    pub fn example_count(&self) -> usize {
        self.intents.iter().map(|(_, spec)| spec.examples.len()).sum()
    }
}
