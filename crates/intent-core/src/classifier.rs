//! Two-stage intent classifier.
//!
//! Stage 1 scans golden keywords in knowledge base order and resolves on the
//! first substring hit, before any embedding work. Stage 2 embeds the message,
//! scores every intent by the mean similarity to its cached examples, and gates
//! the best score against the confidence threshold. Scores below the threshold
//! are answered with [`FALLBACK_INTENT`] and handed to the fallback sink with the
//! intent that would have been chosen.

use crate::embedding::{Embedder, IntentContext};
use crate::error::ClassifyError;
use crate::fallback::{FallbackSink, UnansweredRecord};
use crate::shared::{DEFAULT_CONFIDENCE_THRESHOLD, FALLBACK_INTENT};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How an intent was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Keyword,
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub user_message: String,
    pub intent: String,
    pub confidence: f32,
    pub method: Method,
}

impl ClassificationResult {
    pub fn is_fallback(&self) -> bool {
        self.intent == FALLBACK_INTENT
    }
}

/// Classifier for one dataset. Holds only shared, read-only state, so a single
/// instance serves any number of concurrent requests.
pub struct IntentClassifier {
    context: Arc<IntentContext>,
    embedder: Arc<dyn Embedder>,
    sink: Arc<dyn FallbackSink>,
    threshold: f32,
    embed_timeout: Option<Duration>,
}

impl IntentClassifier {
    pub fn new(
        context: Arc<IntentContext>,
        embedder: Arc<dyn Embedder>,
        sink: Arc<dyn FallbackSink>,
    ) -> Self {
        Self {
            context,
            embedder,
            sink,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            embed_timeout: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.embed_timeout = timeout;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn context(&self) -> &IntentContext {
        &self.context
    }

    pub async fn classify(&self, message: &str) -> Result<ClassificationResult, ClassifyError> {
        if message.trim().is_empty() {
            return Err(ClassifyError::input("message must not be empty"));
        }
        let normalized = message.to_lowercase();

        if let Some(intent) = self.keyword_match(&normalized) {
            tracing::debug!(target: "intent::classifier", intent, "Golden keyword match");
            return Ok(ClassificationResult {
                user_message: message.to_string(),
                intent: intent.to_string(),
                confidence: 1.0,
                method: Method::Keyword,
            });
        }

        let (best_intent, score) = self.semantic_best(&normalized).await?;

        if score >= self.threshold {
            tracing::debug!(target: "intent::classifier", intent = best_intent.as_str(), score, "Semantic match");
            return Ok(ClassificationResult {
                user_message: message.to_string(),
                intent: best_intent,
                confidence: score,
                method: Method::Semantic,
            });
        }

        tracing::debug!(
            target: "intent::classifier",
            suggested = best_intent.as_str(),
            score,
            threshold = self.threshold,
            "Below threshold, answering with fallback"
        );
        self.sink.record(UnansweredRecord::now(
            self.context.dataset(),
            message,
            best_intent,
            score,
        ));
        Ok(ClassificationResult {
            user_message: message.to_string(),
            intent: FALLBACK_INTENT.to_string(),
            confidence: score,
            method: Method::Semantic,
        })
    }

    /// First intent (in knowledge base order) with a keyword contained in `normalized`.
    fn keyword_match(&self, normalized: &str) -> Option<&str> {
        self.context
            .knowledge()
            .iter()
            .find(|(_, spec)| {
                spec.golden_keywords
                    .iter()
                    .any(|kw| normalized.contains(kw.as_str()))
            })
            .map(|(name, _)| name)
    }

    /// Best intent by mean example similarity; `("fallback", 0.0)` when nothing is scorable.
    async fn semantic_best(&self, normalized: &str) -> Result<(String, f32), ClassifyError> {
        let query = match self.embed_timeout {
            Some(limit) => tokio::time::timeout(limit, self.embedder.embed(normalized))
                .await
                .map_err(|_| ClassifyError::Timeout(limit))?,
            None => self.embedder.embed(normalized).await,
        }
        .map_err(|e| ClassifyError::Embedding(e.to_string()))?;

        let query = match query {
            Some(q) if !q.is_degenerate() => q,
            _ => return Err(ClassifyError::input("message not embeddable")),
        };

        let mut best: Option<(&str, f32)> = None;
        for (intent, examples) in self.context.cache().iter() {
            let mut sum = 0.0f32;
            let mut count = 0usize;
            for embedding in examples.iter().filter_map(|e| e.embedding.as_ref()) {
                sum += self.embedder.similarity(&query, embedding);
                count += 1;
            }
            if count == 0 {
                continue;
            }
            let mean = sum / count as f32;
            if !mean.is_finite() {
                tracing::warn!(target: "intent::classifier", intent, "Non-finite similarity, intent skipped");
                continue;
            }
            // Strict comparison keeps the earliest intent on ties.
            match best {
                Some((_, top)) if mean <= top => {}
                _ => best = Some((intent, mean)),
            }
        }

        Ok(match best {
            Some((intent, score)) => (intent.to_string(), score),
            None => (FALLBACK_INTENT.to_string(), 0.0),
        })
    }
}
