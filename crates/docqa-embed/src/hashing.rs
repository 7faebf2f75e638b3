//! Feature-hashing embedder.

use async_trait::async_trait;

use docqa_core::{Embedder, RagError, Result};

use crate::onnx::l2_normalize;

/// Deterministic bag-of-words embedder using the hashing trick.
///
/// Each lowercased alphanumeric term is hashed with blake3 into one of
/// `dimension` buckets with a sign taken from the hash, then the vector is L2
/// normalized. Texts sharing terms get positive cosine similarity.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::config("hashing embedder dimension must be positive"));
        }
        Ok(Self {
            dimension,
            model_name: format!("hashing-{}", dimension),
        })
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for term in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = blake3::hash(term.to_lowercase().as_bytes());
            let bytes = hash.as_bytes();
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&bytes[..8]);
            let index = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }
        l2_normalize(vector)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_dimension_and_normalization() {
        let embedder = HashEmbedder::new(64).unwrap();
        let vectors = embedder
            .embed_documents(&["Hello world", "Rust is great"])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 64));
        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(embedder.model_name(), "hashing-64");
    }

    #[tokio::test]
    async fn test_deterministic_and_case_insensitive() {
        let embedder = HashEmbedder::new(128).unwrap();
        let a = embedder.embed_query("Refund Policy").await.unwrap();
        let b = embedder.embed_query("refund policy").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_shared_terms_are_closer() {
        let embedder = HashEmbedder::new(384).unwrap();
        let query = embedder.embed_query("refund policy").await.unwrap();
        let related = embedder.embed_query("the refund policy explained").await.unwrap();
        let unrelated = embedder.embed_query("zebra migration patterns").await.unwrap();

        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(16).unwrap();
        let v = embedder.embed_query("  ...  ").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert_eq!(
            HashEmbedder::new(0).unwrap_err().error_code(),
            "CONFIG_ERROR"
        );
    }
}
