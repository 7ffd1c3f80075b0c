//! Embedding providers for the intent resolver.

pub use intent_core::{Embedder, Embedding};

mod hashing;
mod remote;

pub use hashing::HashingEmbedder;
pub use remote::RemoteEmbedder;

use intent_core::{EmbedderKind, ResolverConfig};
use std::sync::Arc;

/// Builds the provider selected in config.
pub fn embedder_from_config(config: &ResolverConfig) -> Result<Arc<dyn Embedder>, String> {
    match config.embedder {
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(config.embedder_dimensions))),
        EmbedderKind::Remote => {
            let url = config
                .embedder_url
                .clone()
                .ok_or_else(|| "embedder_url is required for the remote embedder".to_string())?;
            let model = config
                .embedder_model
                .clone()
                .unwrap_or_else(|| remote::DEFAULT_MODEL.to_string());
            let embedder = RemoteEmbedder::new(url, model, config.embedder_api_key.clone())
                .map_err(|e| e.to_string())?;
            Ok(Arc::new(embedder))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_selects_hashing() {
        let embedder = embedder_from_config(&ResolverConfig::default()).unwrap();
        assert_eq!(embedder.name(), "hashing");
    }

    #[test]
    fn test_remote_requires_url() {
        let config = ResolverConfig {
            embedder: EmbedderKind::Remote,
            ..ResolverConfig::default()
        };
        assert!(embedder_from_config(&config).is_err());
    }

    #[test]
    fn test_remote_from_config() {
        let config = ResolverConfig {
            embedder: EmbedderKind::Remote,
            embedder_url: Some("http://127.0.0.1:9/v1/embeddings".into()),
            ..ResolverConfig::default()
        };
        let embedder = embedder_from_config(&config).unwrap();
        assert_eq!(embedder.name(), "remote");
    }
}
