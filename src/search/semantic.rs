use crate::search::embedding::EmbeddingProvider;
use crate::search::query::SemanticFailure;
use crate::search::vector::VectorIndex;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Map a raw cosine score onto the [0, 1] similarity scale
///
/// Negative cosine means no similarity: `clamp(cosine, 0, 1)`.
pub fn similarity_from_cosine(cosine: f32) -> f32 {
    if cosine.is_nan() {
        return 0.0;
    }
    cosine.clamp(0.0, 1.0)
}

/// Embeds the query text and looks up nearest recipes
#[derive(Clone)]
pub struct SemanticRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    timeout: Duration,
    min_similarity: f32,
}

impl SemanticRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        timeout: Duration,
        min_similarity: f32,
    ) -> Self {
        Self {
            embedder,
            index,
            timeout,
            min_similarity,
        }
    }

    pub fn min_similarity(&self) -> f32 {
        self.min_similarity
    }

    /// Up to `k` `(recipe_id, similarity)` pairs with similarity at or above the floor
    ///
    /// `min_similarity` overrides the configured floor. Ties are ordered by id.
    /// Collaborator failures come back as a [`SemanticFailure`], never as a
    /// transport error.
    pub async fn retrieve(
        &self,
        text: &str,
        k: usize,
        min_similarity: Option<f32>,
    ) -> Result<Vec<(i64, f32)>, SemanticFailure> {
        self.retrieve_from(self.index.as_ref(), text, k, min_similarity)
            .await
    }

    /// Like [`retrieve`](Self::retrieve), but against `index` instead of the configured one
    pub async fn retrieve_from(
        &self,
        index: &dyn VectorIndex,
        text: &str,
        k: usize,
        min_similarity: Option<f32>,
    ) -> Result<Vec<(i64, f32)>, SemanticFailure> {
        let floor = min_similarity.unwrap_or(self.min_similarity);

        let vector = match timeout(self.timeout, self.embedder.embed(text)).await {
            Ok(Ok(vector)) => vector,
            Ok(Err(e)) => {
                warn!("Embedding failed: {}", e.log_safe());
                return Err(SemanticFailure::EmbeddingUnavailable(e.log_safe()));
            }
            Err(_) => {
                warn!("Embedding timed out after {:?}", self.timeout);
                return Err(SemanticFailure::EmbeddingTimeout);
            }
        };

        let neighbors = match timeout(self.timeout, index.nearest_neighbors(&vector, k)).await {
            Ok(Ok(neighbors)) => neighbors,
            Ok(Err(e)) => {
                warn!("Vector index query failed: {}", e.log_safe());
                return Err(SemanticFailure::IndexQueryFailed(e.log_safe()));
            }
            Err(_) => {
                warn!("Vector index query timed out after {:?}", self.timeout);
                return Err(SemanticFailure::IndexQueryFailed("timed out".to_string()));
            }
        };

        let mut hits: Vec<(i64, f32)> = neighbors
            .into_iter()
            .map(|(id, cosine)| (id, similarity_from_cosine(cosine)))
            .filter(|(_, similarity)| *similarity >= floor)
            .collect();

        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        hits.truncate(k);

        debug!("Semantic retrieval for '{}': {} hits", text, hits.len());
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::search::vector::InMemoryVectorIndex;
    use async_trait::async_trait;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
        fn dimension(&self) -> usize {
            self.0.len()
        }
        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl EmbeddingProvider for SlowEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![1.0, 0.0])
        }
        fn dimension(&self) -> usize {
            2
        }
        fn model_name(&self) -> &str {
            "slow"
        }
    }

    struct BrokenIndex;

    #[async_trait]
    impl VectorIndex for BrokenIndex {
        async fn nearest_neighbors(&self, _vector: &[f32], _k: usize) -> Result<Vec<(i64, f32)>> {
            Err(Error::IndexQuery("connection refused".to_string()))
        }
    }

    fn index() -> Arc<InMemoryVectorIndex> {
        let mut index = InMemoryVectorIndex::new();
        // cosines against [1, 0]: 1.0, 0.8, 0.8, 0.2, -0.6
        index.insert(5, vec![1.0, 0.0]).unwrap();
        index.insert(2, vec![0.8, 0.6]).unwrap();
        index.insert(1, vec![0.8, -0.6]).unwrap();
        index.insert(3, vec![0.2, 0.98]).unwrap();
        index.insert(4, vec![-0.6, 0.8]).unwrap();
        Arc::new(index)
    }

    fn retriever(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> SemanticRetriever {
        SemanticRetriever::new(embedder, index, Duration::from_millis(50), 0.3)
    }

    #[test]
    fn test_similarity_from_cosine() {
        assert_eq!(similarity_from_cosine(0.75), 0.75);
        assert_eq!(similarity_from_cosine(-0.4), 0.0);
        assert_eq!(similarity_from_cosine(1.2), 1.0);
        assert_eq!(similarity_from_cosine(f32::NAN), 0.0);
    }

    #[tokio::test]
    async fn test_floor_and_tie_order() {
        let r = retriever(Arc::new(FixedEmbedder(vec![1.0, 0.0])), index());
        let hits = r.retrieve("anything", 10, None).await.unwrap();
        let ids: Vec<i64> = hits.iter().map(|(id, _)| *id).collect();

        // 3 (0.2) and 4 (negative) fall under the 0.3 floor; 1 and 2 tie
        assert_eq!(ids, vec![5, 1, 2]);
        assert!(hits.iter().all(|(_, s)| *s >= 0.3));
    }

    #[tokio::test]
    async fn test_floor_applies_within_top_k() {
        let r = retriever(Arc::new(FixedEmbedder(vec![1.0, 0.0])), index());
        let hits = r.retrieve("anything", 5, Some(0.9)).await.unwrap();
        assert_eq!(hits, vec![(5, 1.0)]);

        let hits = r.retrieve("anything", 5, Some(0.0)).await.unwrap();
        assert_eq!(hits.len(), 5);
        assert_eq!(hits.last().map(|h| h.1), Some(0.0));
    }

    #[tokio::test]
    async fn test_embedding_timeout_is_reported() {
        let r = retriever(Arc::new(SlowEmbedder), index());
        let result = r.retrieve("soup", 5, None).await;
        assert_eq!(result, Err(SemanticFailure::EmbeddingTimeout));
    }

    #[tokio::test]
    async fn test_index_failure_is_reported() {
        let r = retriever(Arc::new(FixedEmbedder(vec![1.0, 0.0])), Arc::new(BrokenIndex));
        let result = r.retrieve("soup", 5, None).await;
        assert!(matches!(result, Err(SemanticFailure::IndexQueryFailed(_))));
    }
}
