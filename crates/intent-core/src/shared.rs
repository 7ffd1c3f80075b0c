//! Shared configuration used by the core, the providers, and the gateway.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Dataset used when a request does not name one.
pub const DEFAULT_DATASET: &str = "default";

/// Sentinel intent returned when nothing clears the confidence threshold.
pub const FALLBACK_INTENT: &str = "fallback";

/// Default stage-2 gate.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.65;

/// Embedding provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Local token feature hashing; deterministic, no model files.
    #[default]
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint.
    Remote,
}

/// Global resolver configuration (gateway + classifier). Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Application identity shown in status responses.
    pub app_name: String,
    /// Bind address for the gateway.
    pub host: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// Stage-2 scores below this are answered with the fallback intent and logged.
    pub confidence_threshold: f32,
    /// CSV file receiving low-confidence questions.
    pub unanswered_log_path: String,
    /// Dataset used for requests without (or with an unknown) `dataset`.
    pub default_dataset: String,
    /// Dataset name -> knowledge base JSON path.
    #[serde(default)]
    pub datasets: BTreeMap<String, String>,

    #[serde(default)]
    pub embedder: EmbedderKind,
    /// Vector width for the hashing embedder.
    pub embedder_dimensions: usize,
    #[serde(default)]
    pub embedder_url: Option<String>,
    #[serde(default)]
    pub embedder_model: Option<String>,
    #[serde(default)]
    pub embedder_api_key: Option<String>,
    /// Timeout around the per-request embedding call, in milliseconds. 0 disables it.
    #[serde(default)]
    pub embed_timeout_ms: u64,

    /// CORS allow-list.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Extra origins as a comma separated list (convenient for env overrides).
    #[serde(default)]
    pub allowed_origins_extra: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            app_name: "Intent Resolver".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            unanswered_log_path: "unanswered_questions.csv".to_string(),
            default_dataset: DEFAULT_DATASET.to_string(),
            datasets: [(DEFAULT_DATASET.to_string(), "knowledge_base.json".to_string())]
                .into_iter()
                .collect(),
            embedder: EmbedderKind::Hashing,
            embedder_dimensions: 256,
            embedder_url: None,
            embedder_model: None,
            embedder_api_key: None,
            embed_timeout_ms: 0,
            allowed_origins: default_origins(),
            allowed_origins_extra: None,
        }
    }
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

impl ResolverConfig {
    /// Load config from file and environment. Precedence: env > `INTENT_CONFIG` file
    /// (default `config/resolver`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("INTENT_CONFIG").unwrap_or_else(|_| "config/resolver".to_string());
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("app_name", defaults.app_name.clone())?
            .set_default("host", defaults.host.clone())?
            .set_default("port", i64::from(defaults.port))?
            .set_default("confidence_threshold", f64::from(defaults.confidence_threshold))?
            .set_default("unanswered_log_path", defaults.unanswered_log_path.clone())?
            .set_default("default_dataset", defaults.default_dataset.clone())?
            .set_default("embedder", "hashing")?
            .set_default("embedder_dimensions", defaults.embedder_dimensions as i64)?
            .set_default("embed_timeout_ms", 0_i64)?
            .set_default("allowed_origins", defaults.allowed_origins.clone())?;

        let path = Path::new(&config_path);
        let with_toml = path.with_extension("toml");
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else if with_toml.exists() {
            builder.add_source(config::File::from(with_toml.as_path()))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("INTENT").separator("__"))
            .build()?;

        let mut loaded: Self = built.try_deserialize()?;
        if loaded.datasets.is_empty() {
            loaded.datasets = defaults.datasets;
        }
        loaded.validate()?;
        Ok(loaded)
    }

    /// Rejects values the classifier cannot work with.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if !self.confidence_threshold.is_finite() {
            return Err(config::ConfigError::Message(format!(
                "confidence_threshold must be a finite number, got {}",
                self.confidence_threshold
            )));
        }
        if !self.datasets.contains_key(&self.default_dataset) {
            return Err(config::ConfigError::Message(format!(
                "default_dataset '{}' has no entry in datasets",
                self.default_dataset
            )));
        }
        if self.embedder == EmbedderKind::Remote && self.embedder_url.is_none() {
            return Err(config::ConfigError::Message(
                "embedder = \"remote\" requires embedder_url".to_string(),
            ));
        }
        Ok(())
    }

    /// Timeout around message embedding, if enabled.
    pub fn embed_timeout(&self) -> Option<Duration> {
        (self.embed_timeout_ms > 0).then(|| Duration::from_millis(self.embed_timeout_ms))
    }

    /// All CORS origins: the configured list plus the comma separated extras, de-duplicated.
    pub fn cors_origins(&self) -> Vec<String> {
        let extra = self
            .allowed_origins_extra
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string);
        let mut out: Vec<String> = Vec::new();
        for origin in self.allowed_origins.iter().cloned().chain(extra) {
            if !out.contains(&origin) {
                out.push(origin);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_origins_merges_extras_without_duplicates() {
        let config = ResolverConfig {
            allowed_origins_extra: Some(" https://example.org, http://localhost:3000 ,,".into()),
            ..ResolverConfig::default()
        };
        assert_eq!(
            config.cors_origins(),
            vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
                "https://example.org".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_rejects_non_finite_threshold() {
        let config = ResolverConfig {
            confidence_threshold: f32::NAN,
            ..ResolverConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_default_dataset_entry() {
        let config = ResolverConfig {
            default_dataset: "vswebdesign".into(),
            ..ResolverConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_embed_timeout_disabled_at_zero() {
        assert_eq!(ResolverConfig::default().embed_timeout(), None);
        let config = ResolverConfig {
            embed_timeout_ms: 250,
            ..ResolverConfig::default()
        };
        assert_eq!(config.embed_timeout(), Some(Duration::from_millis(250)));
    }
}
