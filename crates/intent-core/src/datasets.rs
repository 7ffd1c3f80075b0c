//! Registry of per-dataset classifiers (one knowledge base per site).

use crate::classifier::IntentClassifier;
use crate::embedding::{Embedder, IntentContext};
use crate::error::KnowledgeBaseError;
use crate::fallback::FallbackSink;
use crate::knowledge;
use crate::shared::ResolverConfig;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Classifiers keyed by dataset name, with a default for unnamed or unknown datasets.
pub struct DatasetRegistry {
    classifiers: BTreeMap<String, Arc<IntentClassifier>>,
    default_dataset: String,
}

impl DatasetRegistry {
    /// Loads every configured dataset and builds its embedding cache. Datasets pointing at the
    /// same file share one knowledge base and cache. Any failure is fatal.
    pub async fn from_config(
        config: &ResolverConfig,
        embedder: Arc<dyn Embedder>,
        sink: Arc<dyn FallbackSink>,
    ) -> Result<Self, KnowledgeBaseError> {
        let mut classifiers = BTreeMap::new();
        let mut contexts: HashMap<&str, Arc<IntentContext>> = HashMap::new();
        for (dataset, path) in &config.datasets {
            let context = match contexts.get(path.as_str()) {
                Some(loaded) => {
                    tracing::debug!(target: "intent::datasets", dataset = dataset.as_str(), path = path.as_str(), "Sharing loaded knowledge base");
                    loaded.with_dataset(dataset.as_str())
                }
                None => {
                    let kb = knowledge::load_path(path)?;
                    let context = IntentContext::build(dataset.as_str(), kb, embedder.as_ref()).await?;
                    contexts.insert(path.as_str(), Arc::clone(&context));
                    context
                }
            };
            let classifier = IntentClassifier::new(context, Arc::clone(&embedder), Arc::clone(&sink))
                .with_threshold(config.confidence_threshold)
                .with_embed_timeout(config.embed_timeout());
            classifiers.insert(dataset.clone(), Arc::new(classifier));
        }
        if !classifiers.contains_key(&config.default_dataset) {
            return Err(KnowledgeBaseError::NotFound(format!(
                "no knowledge base configured for default dataset '{}'",
                config.default_dataset
            )));
        }
        tracing::info!(
            target: "intent::datasets",
            datasets = classifiers.len(),
            default = config.default_dataset.as_str(),
            threshold = config.confidence_threshold,
            "Datasets ready"
        );
        Ok(Self {
            classifiers,
            default_dataset: config.default_dataset.clone(),
        })
    }

    /// Classifier for `dataset`; missing or unknown names resolve to the default dataset.
    pub fn resolve(&self, dataset: Option<&str>) -> &Arc<IntentClassifier> {
        if let Some(name) = dataset.filter(|s| !s.is_empty()) {
            if let Some(classifier) = self.classifiers.get(name) {
                return classifier;
            }
            tracing::debug!(target: "intent::datasets", dataset = name, "Unknown dataset, using default");
        }
        &self.classifiers[&self.default_dataset]
    }

    pub fn default_dataset(&self) -> &str {
        &self.default_dataset
    }

    /// Dataset names with their classifiers, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<IntentClassifier>)> {
        self.classifiers.iter().map(|(k, v)| (k.as_str(), v))
    }
}
