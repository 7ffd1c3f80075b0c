//! Embedder backed by an OpenAI-compatible `/embeddings` HTTP endpoint.

use intent_core::{EmbedError, Embedder, Embedding};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub(crate) const DEFAULT_MODEL: &str = "text-embedding-3-small";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct RemoteEmbedder {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl RemoteEmbedder {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, EmbedError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EmbedError::new(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            model: model.into(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// First embedding in the response body; an empty vector means "no usable embedding".
fn parse_response(body: &str) -> Result<Option<Embedding>, EmbedError> {
    let response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| EmbedError::new(format!("failed to parse embeddings response: {e}")))?;
    let embedding = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| EmbedError::new("no embedding in response"))?
        .embedding;
    Ok((!embedding.is_empty()).then(|| Embedding::new(embedding)))
}

#[async_trait::async_trait]
impl Embedder for RemoteEmbedder {
    fn name(&self) -> &str {
        "remote"
    }

    async fn embed(&self, text: &str) -> Result<Option<Embedding>, EmbedError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: vec![text],
        };
        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| EmbedError::new(format!("embeddings request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EmbedError::new(format!("failed to read embeddings response: {e}")))?;
        if !status.is_success() {
            tracing::warn!(target: "intent::providers", %status, "Embeddings endpoint returned an error");
            return Err(EmbedError::new(format!(
                "embeddings endpoint error (status {status}): {body}"
            )));
        }
        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_takes_first_embedding() {
        let body = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-0.25]}],"model":"m"}"#;
        let embedding = parse_response(body).unwrap().unwrap();
        assert_eq!(embedding.as_slice().to_vec(), vec![0.5f32, -0.25]);
    }

    #[test]
    fn test_parse_response_empty_vector_is_none() {
        let body = r#"{"data":[{"embedding":[]}]}"#;
        assert!(parse_response(body).unwrap().is_none());
    }

    #[test]
    fn test_parse_response_errors() {
        assert!(parse_response(r#"{"data":[]}"#).is_err());
        assert!(parse_response("not json").is_err());
    }

    #[test]
    fn test_request_shape() {
        let request = EmbeddingRequest {
            model: DEFAULT_MODEL,
            input: vec!["hola"],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["input"][0], "hola");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let embedder = RemoteEmbedder::new("http://127.0.0.1:9/v1/embeddings", "m", None).unwrap();
        assert_eq!(embedder.model(), "m");
        assert!(embedder.embed("hola").await.is_err());
    }
}
