//! Local embedder based on feature hashing of words and character trigrams.
//!
//! No model files and fully deterministic, which makes it the default provider
//! for small knowledge bases. Trigrams let inflected forms ("precio", "precios")
//! land close to each other.

use intent_core::{EmbedError, Embedder, Embedding};

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn add_feature(&self, values: &mut [f32], feature: &str, weight: f32) {
        let hash = fnv1a(feature.as_bytes());
        let index = (hash % self.dimensions as u64) as usize;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        values[index] += sign * weight;
    }

    fn vectorize(&self, text: &str) -> Option<Vec<f32>> {
        let lowered = text.to_lowercase();
        let mut values = vec![0.0f32; self.dimensions];
        let mut tokens = 0usize;
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            tokens += 1;
            self.add_feature(&mut values, word, WORD_WEIGHT);
            let padded: Vec<char> = format!(" {word} ").chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.add_feature(&mut values, &gram, TRIGRAM_WEIGHT);
            }
        }
        (tokens > 0).then_some(values)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait::async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, text: &str) -> Result<Option<Embedding>, EmbedError> {
        Ok(self.vectorize(text).map(Embedding::new))
    }
}

/// 64-bit FNV-1a; stable across platforms and compiler versions.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn embed(e: &HashingEmbedder, text: &str) -> Embedding {
        e.embed(text).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_deterministic_and_case_insensitive() {
        let e = HashingEmbedder::default();
        let a = embed(&e, "Cuánto cuesta una página web").await;
        let b = embed(&e, "cuánto cuesta una PÁGINA web").await;
        assert_eq!(a, b);
        assert_eq!(a.dimension(), 256);
    }

    #[tokio::test]
    async fn test_related_texts_score_higher() {
        let e = HashingEmbedder::default();
        let query = embed(&e, "precio de una web").await;
        let related = embed(&e, "cuáles son los precios de la web").await;
        let unrelated = embed(&e, "horario de atención al cliente").await;
        assert!(e.similarity(&query, &related) > e.similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_text_without_tokens_has_no_embedding() {
        let e = HashingEmbedder::default();
        assert!(e.embed("").await.unwrap().is_none());
        assert!(e.embed("¿¡ ... !?").await.unwrap().is_none());
    }

    #[test]
    fn test_zero_dimensions_clamped() {
        assert_eq!(HashingEmbedder::new(0).dimensions(), 1);
    }

    #[test]
    fn test_fnv1a_known_value() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }
}
