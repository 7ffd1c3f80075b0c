//! Error types for knowledge base loading and classification.

use std::time::Duration;
use thiserror::Error;

/// Failure while classifying a single message.
///
/// `Input` is a client-side rejection; the other variants mean the embedding
/// provider could not serve the request. None of them are retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    /// Message is empty, or could not be turned into a usable vector.
    #[error("{reason}")]
    Input { reason: String },

    /// Embedding provider returned an error.
    #[error("embedding provider failed: {0}")]
    Embedding(String),

    /// Embedding call exceeded the dispatch timeout.
    #[error("embedding timed out after {0:?}")]
    Timeout(Duration),
}

impl ClassifyError {
    pub fn input(reason: impl Into<String>) -> Self {
        Self::Input {
            reason: reason.into(),
        }
    }

    /// True for client-side rejections.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input { .. })
    }
}

/// Error raised by an embedding provider.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct EmbedError(pub String);

impl EmbedError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Fatal startup error while reading a knowledge base.
#[derive(Error, Debug)]
pub enum KnowledgeBaseError {
    #[error("knowledge base not found at {0}")]
    NotFound(String),

    #[error("I/O error reading knowledge base: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid knowledge base JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate intent '{0}'")]
    DuplicateIntent(String),

    #[error("intent names must not be empty")]
    EmptyIntentName,

    #[error("failed to embed examples for dataset '{dataset}': {source}")]
    Embedding {
        dataset: String,
        #[source]
        source: EmbedError,
    },
}
