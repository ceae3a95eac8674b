use async_trait::async_trait;

use nh_core::{Embedder, Result};

const DIMENSION: usize = 768;

/// Deterministic offline embedder: character frequencies hashed into a
/// fixed-length vector. Good enough for tests and local runs where the
/// hosted provider is not configured.
#[derive(Debug, Default)]
pub struct DummyEmbedder;

impl DummyEmbedder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Embedder for DummyEmbedder {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0_f32; DIMENSION];
        let len = text.chars().count().max(1) as f32;
        for c in text.chars() {
            embedding[(c as usize) % DIMENSION] += 1.0 / len;
        }
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeddings_are_deterministic() {
        let embedder = DummyEmbedder::new();
        let a = embedder.embed("interest rates").await.unwrap();
        let b = embedder.embed("interest rates").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DIMENSION);
        assert!(a.iter().any(|v| *v > 0.0));
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zeroes() {
        let embedder = DummyEmbedder::new();
        let v = embedder.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
