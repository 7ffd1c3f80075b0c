//! intent-core: intent resolution for a website chat assistant.
//!
//! A message is first matched against golden keywords, then scored by mean
//! semantic similarity to each intent's example utterances. Low-confidence
//! answers fall back to a sentinel intent and are logged for retraining.

mod classifier;
mod datasets;
mod embedding;
mod error;
mod fallback;
mod knowledge;
mod shared;

pub use shared::{
    EmbedderKind, ResolverConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DATASET, FALLBACK_INTENT,
};

pub use error::{ClassifyError, EmbedError, KnowledgeBaseError};

pub use knowledge::{load_path as load_knowledge_base, IntentSpec, KnowledgeBase};

pub use embedding::{
    cosine_similarity, CachedExample, Embedder, Embedding, EmbeddingCache, IntentContext,
};

pub use fallback::{
    CsvFallbackLogger, FallbackSink, MemoryFallbackLog, UnansweredRecord, CSV_HEADERS,
};

pub use classifier::{ClassificationResult, IntentClassifier, Method};

pub use datasets::DatasetRegistry;
