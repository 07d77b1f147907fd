use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{EmbedError, Embedder};

/// Offline embedding backend using the hashing trick: each term is hashed
/// into a bucket with a hash-derived sign, then the vector is L2-normalized.
/// Texts sharing vocabulary land near each other, which is enough for exact
/// and near-duplicate FAQ lookup without any remote service. Deterministic,
/// so it is also what the tests run against.
#[derive(Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(8),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
                digest[7],
            ]) as usize
                % self.dimension;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn id(&self) -> &str {
        "hashing"
    }

    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.embed_text(text))
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.embed_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (na * nb)
    }

    #[tokio::test]
    async fn identical_text_embeds_identically() {
        let embedder = HashingEmbedder::new(256);
        let a = embedder.embed_document("minimum SIP amount").await.unwrap();
        let b = embedder.embed_query("minimum SIP amount").await.unwrap();
        assert_eq!(a, b);
        assert!(cosine(&a, &b) > 0.999);
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher_than_disjoint() {
        let embedder = HashingEmbedder::new(256);
        let doc = embedder
            .embed_document("What is the minimum SIP amount for this fund?")
            .await
            .unwrap();
        let close = embedder.embed_query("minimum SIP amount").await.unwrap();
        let far = embedder.embed_query("benchmark index weather").await.unwrap();

        assert!(cosine(&doc, &close) > cosine(&doc, &far));
        assert!(cosine(&doc, &close) > 0.4);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::new(64);
        let v = embedder.embed_document("").await.unwrap();
        assert_eq!(v.len(), 64);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
