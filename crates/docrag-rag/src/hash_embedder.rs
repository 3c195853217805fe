//! Offline hash-based embeddings
//!
//! Words and bigrams are hashed into a fixed number of buckets and the result
//! is L2-normalised. Texts sharing vocabulary land close together under cosine
//! similarity. Good enough for local runs and tests; not a semantic model.
//!
//! Buckets come from an MD5 digest, so vectors stay identical across builds
//! and processes that share an index.

use async_trait::async_trait;

use docrag_core::{Embedder, Result};

pub const DEFAULT_HASH_DIMENSIONS: usize = 384;

/// Deterministic embedder that needs no network access
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, token: &str) -> (usize, u64) {
        let digest = md5::compute(token.as_bytes());
        let hash = digest.0[..8]
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
        ((hash % self.dimensions as u64) as usize, hash)
    }

    /// Embed one text synchronously
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let normalized: String = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let mut vector = vec![0.0f32; self.dimensions];

        for word in &words {
            let (idx, hash) = self.bucket(word);
            vector[idx] += 1.0;

            if word.len() > 3 {
                let secondary = ((hash >> 16) % self.dimensions as u64) as usize;
                vector[secondary] += 0.5;
            }
        }

        for pair in words.windows(2) {
            let (idx, _) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            vector[idx] += 0.3;
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str {
        "hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::cosine_similarity;

    #[test]
    fn vectors_are_normalized_and_sized() {
        let embedder = HashEmbedder::new(64);
        let vector = embedder.embed("The sky is blue.");
        assert_eq!(vector.len(), 64);
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn buckets_are_stable_across_processes() {
        let vector = HashEmbedder::new(64).embed("sky");
        let hot: Vec<usize> = (0..64).filter(|i| vector[*i] != 0.0).collect();
        assert_eq!(hot, vec![53]);
        assert_eq!(vector[53], 1.0);
    }

    #[test]
    fn empty_text_is_the_zero_vector() {
        let vector = HashEmbedder::default().embed("  ");
        assert!(vector.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed("What color is the sky?");
        let related = embedder.embed("The sky is blue.");
        let unrelated = embedder.embed("Invoices are due within thirty days.");

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn embedding_is_deterministic() {
        let embedder = HashEmbedder::default();
        let texts = vec!["same text".to_string(), "same text".to_string()];
        let vectors = embedder.embed_documents(&texts).await.unwrap();
        assert_eq!(vectors[0], vectors[1]);
        assert_eq!(embedder.embed_query("same text").await.unwrap(), vectors[0]);
    }
}
