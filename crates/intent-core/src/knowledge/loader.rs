//! JSON loading that keeps intents in file order.

use super::{IntentSpec, KnowledgeBase};
use crate::error::KnowledgeBaseError;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIntent {
    Examples(Vec<String>),
    Full(IntentSpec),
}

impl From<RawIntent> for IntentSpec {
    fn from(raw: RawIntent) -> Self {
        match raw {
            RawIntent::Examples(examples) => IntentSpec {
                golden_keywords: Vec::new(),
                examples,
            },
            RawIntent::Full(spec) => spec,
        }
    }
}

/// Top-level object read entry by entry so neither order nor duplicates are lost.
pub(super) struct RawKnowledgeBase(pub(super) Vec<(String, IntentSpec)>);

impl<'de> Deserialize<'de> for RawKnowledgeBase {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = RawKnowledgeBase;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping intent names to intent definitions")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut intents = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, raw)) = map.next_entry::<String, RawIntent>()? {
                    intents.push((name, IntentSpec::from(raw)));
                }
                Ok(RawKnowledgeBase(intents))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// Reads a knowledge base file. Any failure here is a fatal startup error.
pub fn load_path<P: AsRef<Path>>(path: P) -> Result<KnowledgeBase, KnowledgeBaseError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(KnowledgeBaseError::NotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    let kb = KnowledgeBase::from_json_str(&text)?;
    tracing::info!(
        target: "intent::knowledge",
        path = %path.display(),
        intents = kb.len(),
        examples = kb.example_count(),
        "Knowledge base loaded"
    );
    Ok(kb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"contact": {{"golden_keywords": ["whatsapp"], "examples": ["cómo los contacto"]}}}}"#
        )
        .unwrap();
        let kb = load_path(file.path()).unwrap();
        assert_eq!(kb.len(), 1);
        assert_eq!(
            kb.get("contact").unwrap().golden_keywords,
            vec!["whatsapp".to_string()]
        );
    }

    #[test]
    fn test_load_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_path(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, KnowledgeBaseError::NotFound(_)));
    }
}
