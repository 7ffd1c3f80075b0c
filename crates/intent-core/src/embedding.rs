//! Embedding capability consumed by the classifier, and the per-dataset cache of
//! example embeddings built from it at startup.

use crate::error::{EmbedError, KnowledgeBaseError};
use crate::knowledge::KnowledgeBase;
use std::sync::Arc;

/// Dense text vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn norm(&self) -> f32 {
        self.0
            .iter()
            .map(|v| f64::from(*v).powi(2))
            .sum::<f64>()
            .sqrt() as f32
    }

    /// Empty, all-zero, or non-finite vectors carry no direction and cannot be compared.
    /// Large finite components are fine even when the `f32` norm would overflow.
    pub fn is_degenerate(&self) -> bool {
        self.0.is_empty()
            || self.0.iter().any(|v| !v.is_finite())
            || self.0.iter().all(|v| *v == 0.0)
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Cosine similarity; 0.0 when either side has zero norm or dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    // Accumulate in f64 so large components do not overflow the norms.
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// Text-to-vector capability (a pretrained model, a remote service, ...).
///
/// Implementations must be deterministic for identical text so example
/// embeddings can be computed once and reused for the process lifetime.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Embeds `text`. `Ok(None)` means the text has no usable vector
    /// (e.g. every token is out of vocabulary).
    async fn embed(&self, text: &str) -> Result<Option<Embedding>, EmbedError>;

    /// Similarity between two embeddings. Only compared relatively, so the
    /// range depends on the metric.
    fn similarity(&self, a: &Embedding, b: &Embedding) -> f32 {
        cosine_similarity(a.as_slice(), b.as_slice())
    }
}

/// One example utterance and its vector, if it had a usable one.
#[derive(Debug, Clone)]
pub struct CachedExample {
    pub utterance: String,
    pub embedding: Option<Embedding>,
}

/// Example embeddings per intent, in knowledge base order.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingCache {
    intents: Vec<(String, Vec<CachedExample>)>,
}

impl EmbeddingCache {
    /// Embeds every example of every intent. Null or degenerate vectors are kept as `None`.
    pub async fn build(kb: &KnowledgeBase, embedder: &dyn Embedder) -> Result<Self, EmbedError> {
        let mut intents = Vec::with_capacity(kb.len());
        let mut usable = 0usize;
        let mut unusable = 0usize;
        for (name, spec) in kb.iter() {
            let mut examples = Vec::with_capacity(spec.examples.len());
            for utterance in &spec.examples {
                let embedding = embedder
                    .embed(utterance)
                    .await?
                    .filter(|e| !e.is_degenerate());
                if embedding.is_some() {
                    usable += 1;
                } else {
                    unusable += 1;
                    tracing::debug!(
                        target: "intent::embedding",
                        intent = name,
                        utterance = utterance.as_str(),
                        "Example has no usable embedding"
                    );
                }
                examples.push(CachedExample {
                    utterance: utterance.clone(),
                    embedding,
                });
            }
            intents.push((name.to_string(), examples));
        }
        tracing::info!(
            target: "intent::embedding",
            embedder = embedder.name(),
            usable,
            unusable,
            "Embedding cache built"
        );
        Ok(Self { intents })
    }

    /// Cached examples per intent, in knowledge base order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CachedExample])> {
        self.intents
            .iter()
            .map(|(name, examples)| (name.as_str(), examples.as_slice()))
    }

    /// Usable vectors of one intent.
    pub fn usable<'a>(&'a self, intent: &'a str) -> impl Iterator<Item = &'a Embedding> + 'a {
        self.intents
            .iter()
            .filter(move |(name, _)| name == intent)
            .flat_map(|(_, examples)| examples.iter().filter_map(|e| e.embedding.as_ref()))
    }
}

/// Immutable per-dataset state shared by every request: the knowledge base and its cache.
#[derive(Debug)]
pub struct IntentContext {
    dataset: String,
    knowledge: Arc<KnowledgeBase>,
    cache: Arc<EmbeddingCache>,
}

impl IntentContext {
    /// Builds the context once at startup.
    pub async fn build(
        dataset: impl Into<String>,
        knowledge: KnowledgeBase,
        embedder: &dyn Embedder,
    ) -> Result<Arc<Self>, KnowledgeBaseError> {
        let dataset = dataset.into();
        let cache = EmbeddingCache::build(&knowledge, embedder)
            .await
            .map_err(|source| KnowledgeBaseError::Embedding {
                dataset: dataset.clone(),
                source,
            })?;
        Ok(Arc::new(Self {
            dataset,
            knowledge: Arc::new(knowledge),
            cache: Arc::new(cache),
        }))
    }

    /// Same knowledge base and cache under another dataset name, without re-embedding.
    pub fn with_dataset(&self, dataset: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            dataset: dataset.into(),
            knowledge: Arc::clone(&self.knowledge),
            cache: Arc::clone(&self.cache),
        })
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }
}
